use std::sync::{Arc, Mutex, PoisonError, RwLock};

use pdf_planner::Operation;

use crate::error::{Result, RunError};

/// Signed-in user as seen by the tool front end
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub is_pro: bool,
    pub email: Option<String>,
    pub uid: Option<String>,
}

impl UserProfile {
    pub fn pro() -> Self {
        Self {
            is_pro: true,
            ..Default::default()
        }
    }
}

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&UserProfile) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: SubscriptionId,
    entries: Vec<(SubscriptionId, Listener)>,
}

/// Shared user-session state handed to every component that needs it.
///
/// Clones share the same profile and listener set.
#[derive(Clone, Default)]
pub struct SessionContext {
    profile: Arc<RwLock<UserProfile>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("profile", &self.profile())
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile: Arc::new(RwLock::new(profile)),
            listeners: Arc::default(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_pro(&self) -> bool {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_pro
    }

    /// Replace the profile and notify subscribers
    pub fn set_profile(&self, profile: UserProfile) {
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = profile.clone();

        // Listeners run outside the lock so they may subscribe or unsubscribe
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        log::debug!("Session changed, notifying {} listener(s)", listeners.len());
        for listener in listeners {
            listener(&profile);
        }
    }

    pub fn sign_out(&self) {
        self.set_profile(UserProfile::default());
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&UserProfile) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
        listeners.entries.len() != before
    }

    /// Check that the current user may run `operation`
    pub fn authorize(&self, operation: &Operation) -> Result<()> {
        if operation.is_premium() && !self.is_pro() {
            log::warn!("{} requires a Pro account", operation.name());
            return Err(RunError::PremiumRequired(operation.name().to_string()));
        }
        Ok(())
    }
}
