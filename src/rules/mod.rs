//! Delivery rule codec and rule collection editor

pub mod action;
pub mod condition;
pub mod editor;
pub mod resource_id;
mod stored;

pub use action::{build_action, content_types_for, default_content_types, Action, ActionArgs};
pub use condition::{build_condition, Condition, ConditionSpec};
pub use editor::{AfdRule, DeliveryPolicy, EditOutcome};
pub use resource_id::{ResourceId, ResourceScope};
