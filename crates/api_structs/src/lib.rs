mod gateway;
mod notification_log;
mod push_subscription;
mod reminder;
mod reminder_settings;
mod resource_event;
mod status;

pub mod dtos {
    pub use crate::gateway::dtos::*;
    pub use crate::push_subscription::api::PushSubscriptionDTO;
    pub use crate::reminder_settings::dtos::*;
}

pub use crate::gateway::api::*;
pub use crate::notification_log::api::*;
pub use crate::push_subscription::api::*;
pub use crate::reminder::api::*;
pub use crate::reminder_settings::api::*;
pub use crate::resource_event::api::*;
pub use crate::status::api::*;
