//! Preference resolver: load a recipient's preference row, creating it from
//! [`PreferenceDefaults`] the first time the user shows up in the queue.

use uuid::Uuid;

use weighin_common::error::AppError;
use weighin_common::types::{NotificationPreference, PreferenceDefaults};

use crate::store::NotificationStore;

pub struct PreferenceResolver {
    defaults: PreferenceDefaults,
}

impl PreferenceResolver {
    pub fn new(defaults: PreferenceDefaults) -> Self {
        Self { defaults }
    }

    /// Return the user's preferences, inserting the defaults if absent.
    ///
    /// Two resolutions racing for the same new user both end up with the
    /// single stored row; the store resolves the conflict on `user_id`.
    pub async fn resolve(
        &self,
        store: &dyn NotificationStore,
        user_id: Uuid,
    ) -> Result<NotificationPreference, AppError> {
        if let Some(existing) = store.find_preference(user_id).await? {
            return Ok(existing);
        }

        let created = store
            .insert_preference(&self.defaults.to_preference(user_id))
            .await?;

        tracing::info!(user_id = %user_id, "Created default notification preferences");
        Ok(created)
    }
}

impl Default for PreferenceResolver {
    fn default() -> Self {
        Self::new(PreferenceDefaults::default())
    }
}
