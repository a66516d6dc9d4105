pub mod cancel;
mod config;
pub mod constants;
mod events;
pub mod fetch;
pub mod map;
mod options;
pub mod print;
pub mod render;
pub mod tiling;
mod types;
pub mod wms;

pub use cancel::{CancelToken, CancellationController};
pub use config::PrintConfig;
pub use events::{AssetKind, EventSender, PrintEvent};
#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchError, ImageFetcher};
pub use map::{HeadlessMap, MapDescription, MapError, MapHost};
pub use options::*;
pub use print::{PrintComposer, PrintOutput, PrintState};
pub use types::*;
