//! AntiZombieScroll Core Library
//!
//! Platform-independent logic of the AntiZombieScroll browser extension: which
//! site a page belongs to, which scroll inputs to block there, which elements
//! to hide, when to re-evaluate after client-side navigation, and the popup's
//! settings workflow. The browser bindings live in `azs-wasm`; everything
//! here runs against the [`dom::Dom`] and [`agent::EventHooks`] capabilities
//! and is tested with the in-memory [`fixture::FixtureDom`].
//!
//! # Modules
//!
//! - `route`: allocation-free host / path / section extraction
//! - `settings`: feature flags, the settings-change message, store and channel traits
//! - `selector`: CSS-subset structural match-patterns
//! - `dom`: document capability trait
//! - `fixture`: in-memory document tree
//! - `gate`: scroll input interception policy
//! - `suppressor`: idempotent element hiding
//! - `navigation`: section-based route change detection
//! - `sites`: site classification and per-site policy tables
//! - `agent`: page agent owning the single active policy
//! - `challenge`: disable-time verification challenge
//! - `popup`: popup view-model

pub mod agent;
pub mod challenge;
pub mod dom;
pub mod error;
pub mod fixture;
pub mod gate;
pub mod navigation;
pub mod popup;
pub mod route;
pub mod selector;
pub mod settings;
pub mod sites;
pub mod suppressor;

// Re-export commonly used types
pub use agent::{ActivePolicy, AgentConfig, EventHooks, PageAgent};
pub use challenge::Challenge;
pub use dom::Dom;
pub use error::{ChannelError, HookError, MessageError, SelectorError, StoreError};
pub use gate::{GateConfig, GateMode, InputEvent, InputKinds, Offset, Verdict};
pub use navigation::{NavTrigger, NavigationWatcher, RouteChange};
pub use popup::{PendingChallenge, PopupController, ToggleOutcome, Unlock};
pub use selector::SelectorList;
pub use settings::{Feature, FeatureFlags, Message, NotifyChannel, SettingsStore};
pub use sites::{classify_url, policy_for, PagePolicy, Site, View};
