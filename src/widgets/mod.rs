// src/widgets/mod.rs — Dashboard widgets: catalog, payload decoding, HTTP fetchers

pub mod catalog;
pub mod dashboard;
pub mod decode;
pub mod http;
pub mod payloads;

pub use catalog::WidgetKind;
pub use dashboard::{Dashboard, PolledWidget, WidgetStatus};
pub use decode::WidgetPayload;
