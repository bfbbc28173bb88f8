//! Popup Controller
//!
//! View-model behind the settings popup. It owns the visible flag set, the
//! pending challenge and the error indicator; the binding only renders these
//! and forwards clicks. Persisting goes through [`SettingsStore`], page
//! notifications through [`NotifyChannel`].

use crate::challenge::Challenge;
use crate::error::StoreError;
use crate::settings::{load_flags, Feature, FeatureFlags, Message, NotifyChannel, SettingsStore};

/// What a correct challenge answer unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    Disable(Feature),
    /// Reset to defaults, which switches at least one protection off.
    Reset,
}

/// A request waiting for the challenge answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingChallenge {
    pub unlock: Unlock,
    pub challenge: Challenge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Saved and the page agent notified.
    Applied { feature: Feature, value: bool },
    /// Defaults saved; `changed` lists the features that were notified.
    Reset { changed: Vec<Feature> },
    /// Turning a protection off: show this word and wait for the answer.
    ChallengeRequired { word: &'static str },
    /// Wrong answer. The flag is unchanged and the error indicator is up.
    Rejected,
    /// The store refused the write; the visible toggle keeps its old state.
    Reverted(StoreError),
}

pub struct PopupController<S, C> {
    store: S,
    channel: C,
    flags: FeatureFlags,
    pending: Option<PendingChallenge>,
    error_visible: bool,
}

impl<S: SettingsStore, C: NotifyChannel> PopupController<S, C> {
    pub async fn load(store: S, channel: C) -> Self {
        let flags = load_flags(&store).await;
        log::debug!("popup loaded: {flags:?}");
        Self {
            store,
            channel,
            flags,
            pending: None,
            error_visible: false,
        }
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn pending(&self) -> Option<&PendingChallenge> {
        self.pending.as_ref()
    }

    pub fn error_visible(&self) -> bool {
        self.error_visible
    }

    /// The user clicked the switch for `feature`. `pick` selects the
    /// challenge word when one is needed.
    pub async fn toggle(&mut self, feature: Feature, pick: usize) -> ToggleOutcome {
        let target = !self.flags.get(feature);
        self.error_visible = false;

        if !target && feature.is_protection() {
            return self.open_challenge(Unlock::Disable(feature), pick);
        }

        self.pending = None;
        self.commit(feature, target).await
    }

    /// Answer to the open challenge. `None` when no challenge is open.
    pub async fn submit_challenge(&mut self, input: &str) -> Option<ToggleOutcome> {
        let pending = self.pending?;

        if !pending.challenge.verify(input) {
            log::debug!("challenge answer rejected for {:?}", pending.unlock);
            self.error_visible = true;
            return Some(ToggleOutcome::Rejected);
        }

        self.pending = None;
        self.error_visible = false;
        let outcome = match pending.unlock {
            Unlock::Disable(feature) => self.commit(feature, false).await,
            Unlock::Reset => self.apply_defaults().await,
        };
        Some(outcome)
    }

    pub fn cancel_challenge(&mut self) {
        self.pending = None;
        self.error_visible = false;
    }

    /// Restore the default table. When that would switch a protection off
    /// the challenge opens first, like a manual toggle.
    pub async fn reset(&mut self, pick: usize) -> ToggleOutcome {
        self.error_visible = false;

        let defaults = FeatureFlags::default();
        let loosens = self
            .flags
            .diff(&defaults)
            .any(|f| f.is_protection() && !defaults.get(f));
        if loosens {
            return self.open_challenge(Unlock::Reset, pick);
        }

        self.pending = None;
        self.apply_defaults().await
    }

    fn open_challenge(&mut self, unlock: Unlock, pick: usize) -> ToggleOutcome {
        let challenge = Challenge::pick(pick);
        self.pending = Some(PendingChallenge { unlock, challenge });
        ToggleOutcome::ChallengeRequired {
            word: challenge.word(),
        }
    }

    /// Save the default table and notify every feature that changed.
    async fn apply_defaults(&mut self) -> ToggleOutcome {
        let defaults = FeatureFlags::default();
        if let Err(e) = self.store.save_all(&defaults).await {
            log::warn!("reset not saved: {e}");
            return ToggleOutcome::Reverted(e);
        }

        let changed: Vec<Feature> = self.flags.diff(&defaults).collect();
        self.flags = defaults;
        for feature in &changed {
            self.notify(*feature, defaults.get(*feature)).await;
        }
        ToggleOutcome::Reset { changed }
    }

    async fn commit(&mut self, feature: Feature, value: bool) -> ToggleOutcome {
        if let Err(e) = self.store.save(feature, value).await {
            log::warn!("{} not saved: {e}", feature.key());
            return ToggleOutcome::Reverted(e);
        }

        self.flags.set(feature, value);
        self.notify(feature, value).await;
        log::debug!("{} {}", feature.key(), if value { "enabled" } else { "disabled" });
        ToggleOutcome::Applied { feature, value }
    }

    async fn notify(&self, feature: Feature, value: bool) {
        let message = Message::setting_changed(feature, value);
        if let Err(e) = self.channel.send(&message).await {
            // Tabs without a page agent are expected.
            log::info!("page agent not notified: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use futures::executor::block_on;
    use serde_json::{Map, Value};

    use super::*;
    use crate::error::ChannelError;

    #[derive(Default)]
    struct MemoryStore {
        values: RefCell<Map<String, Value>>,
        fail_writes: Cell<bool>,
    }

    impl SettingsStore for MemoryStore {
        async fn load(&self) -> Result<Map<String, Value>, StoreError> {
            Ok(self.values.borrow().clone())
        }

        async fn save(&self, feature: Feature, value: bool) -> Result<(), StoreError> {
            if self.fail_writes.get() {
                return Err(StoreError::Write("quota exceeded".into()));
            }
            self.values
                .borrow_mut()
                .insert(feature.key().to_string(), Value::Bool(value));
            Ok(())
        }

        async fn save_all(&self, flags: &FeatureFlags) -> Result<(), StoreError> {
            if self.fail_writes.get() {
                return Err(StoreError::Write("quota exceeded".into()));
            }
            self.values.borrow_mut().extend(flags.to_stored());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingChannel {
        sent: RefCell<Vec<Message>>,
        no_receiver: bool,
    }

    impl NotifyChannel for RecordingChannel {
        async fn send(&self, message: &Message) -> Result<(), ChannelError> {
            if self.no_receiver {
                return Err(ChannelError::NoReceiver("no content script".into()));
            }
            self.sent.borrow_mut().push(message.clone());
            Ok(())
        }
    }

    fn controller() -> PopupController<MemoryStore, RecordingChannel> {
        block_on(PopupController::load(MemoryStore::default(), RecordingChannel::default()))
    }

    #[test]
    fn test_load_fills_defaults() {
        let store = MemoryStore::default();
        store.values.borrow_mut().insert("x".into(), Value::Bool(false));
        let popup = block_on(PopupController::load(store, RecordingChannel::default()));
        assert!(!popup.flags().get(Feature::X));
        assert!(popup.flags().get(Feature::YouTube));
    }

    #[test]
    fn test_correct_answer_disables_and_notifies() {
        let mut popup = controller();
        let outcome = block_on(popup.toggle(Feature::YouTube, 0));
        let ToggleOutcome::ChallengeRequired { word } = outcome else {
            panic!("expected challenge");
        };
        // still on until answered
        assert!(popup.flags().get(Feature::YouTube));

        let answer: String = word.chars().rev().collect();
        let outcome = block_on(popup.submit_challenge(&answer));
        assert_eq!(
            outcome,
            Some(ToggleOutcome::Applied { feature: Feature::YouTube, value: false })
        );
        assert!(!popup.flags().get(Feature::YouTube));
        assert!(popup.pending().is_none());
        assert!(!popup.error_visible());
        assert_eq!(
            popup.store.values.borrow().get("youtube"),
            Some(&Value::Bool(false))
        );
        assert_eq!(
            *popup.channel.sent.borrow(),
            vec![Message::setting_changed(Feature::YouTube, false)]
        );
    }

    #[test]
    fn test_wrong_answer_keeps_flag_and_shows_error() {
        let mut popup = controller();
        let ToggleOutcome::ChallengeRequired { word } = block_on(popup.toggle(Feature::Instagram, 5)) else {
            panic!("expected challenge");
        };

        for input in [word, "", "nope"] {
            assert_eq!(block_on(popup.submit_challenge(input)), Some(ToggleOutcome::Rejected));
            assert!(popup.flags().get(Feature::Instagram));
            assert!(popup.error_visible());
            assert!(popup.pending().is_some());
        }
        assert!(popup.channel.sent.borrow().is_empty());
        assert!(popup.store.values.borrow().is_empty());

        popup.cancel_challenge();
        assert!(popup.pending().is_none());
        assert!(!popup.error_visible());
        assert_eq!(block_on(popup.submit_challenge("anything")), None);
    }

    #[test]
    fn test_enabling_needs_no_challenge() {
        let mut popup = controller();
        let outcome = block_on(popup.toggle(Feature::YouTubeFeedHidden, 0));
        assert_eq!(
            outcome,
            ToggleOutcome::Applied { feature: Feature::YouTubeFeedHidden, value: true }
        );
        assert!(popup.flags().get(Feature::YouTubeFeedHidden));
    }

    #[test]
    fn test_save_failure_reverts() {
        let mut popup = controller();
        popup.store.fail_writes.set(true);
        let outcome = block_on(popup.toggle(Feature::YouTubeFeedHidden, 0));
        assert!(matches!(outcome, ToggleOutcome::Reverted(StoreError::Write(_))));
        assert!(!popup.flags().get(Feature::YouTubeFeedHidden));
        assert!(popup.channel.sent.borrow().is_empty());
    }

    #[test]
    fn test_missing_receiver_is_not_an_error() {
        let mut popup = block_on(PopupController::load(
            MemoryStore::default(),
            RecordingChannel { no_receiver: true, ..Default::default() },
        ));
        let outcome = block_on(popup.toggle(Feature::YouTubeFeedHidden, 0));
        assert!(matches!(outcome, ToggleOutcome::Applied { .. }));
    }

    fn disable(popup: &mut PopupController<MemoryStore, RecordingChannel>, feature: Feature) {
        let ToggleOutcome::ChallengeRequired { word } = block_on(popup.toggle(feature, 1)) else {
            panic!("expected challenge");
        };
        let answer: String = word.chars().rev().collect();
        block_on(popup.submit_challenge(&answer));
    }

    #[test]
    fn test_reset_that_only_enables_needs_no_challenge() {
        let mut popup = controller();
        disable(&mut popup, Feature::X);
        popup.channel.sent.borrow_mut().clear();

        let outcome = block_on(popup.reset(0));
        assert_eq!(outcome, ToggleOutcome::Reset { changed: vec![Feature::X] });
        assert_eq!(*popup.flags(), FeatureFlags::default());
        assert_eq!(
            *popup.channel.sent.borrow(),
            vec![Message::setting_changed(Feature::X, true)]
        );
    }

    #[test]
    fn test_reset_switching_protection_off_needs_challenge() {
        let mut popup = controller();
        block_on(popup.toggle(Feature::YouTubeFeedHidden, 0));
        disable(&mut popup, Feature::X);
        popup.channel.sent.borrow_mut().clear();

        let ToggleOutcome::ChallengeRequired { word } = block_on(popup.reset(2)) else {
            panic!("expected challenge");
        };
        assert_eq!(popup.pending().map(|p| p.unlock), Some(Unlock::Reset));

        assert_eq!(block_on(popup.submit_challenge("wrong")), Some(ToggleOutcome::Rejected));
        assert!(popup.flags().get(Feature::YouTubeFeedHidden));
        assert!(popup.channel.sent.borrow().is_empty());

        let answer: String = word.chars().rev().collect();
        assert_eq!(
            block_on(popup.submit_challenge(&answer)),
            Some(ToggleOutcome::Reset {
                changed: vec![Feature::YouTubeFeedHidden, Feature::X]
            })
        );
        assert_eq!(*popup.flags(), FeatureFlags::default());
        assert!(popup.pending().is_none());
        assert_eq!(
            *popup.channel.sent.borrow(),
            vec![
                Message::setting_changed(Feature::YouTubeFeedHidden, false),
                Message::setting_changed(Feature::X, true),
            ]
        );
    }

    #[test]
    fn test_reset_save_failure_keeps_flags() {
        let mut popup = controller();
        disable(&mut popup, Feature::Instagram);
        popup.store.fail_writes.set(true);

        let outcome = block_on(popup.reset(0));
        assert!(matches!(outcome, ToggleOutcome::Reverted(StoreError::Write(_))));
        assert!(!popup.flags().get(Feature::Instagram));
    }
}
