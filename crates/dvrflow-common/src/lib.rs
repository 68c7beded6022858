//! dvrflow-common: types shared by the publisher, the worker and the ledger.
//!
//! - **Notifications**: the untrusted "recording finished" batch and its
//!   validation into a [`Recording`]
//! - **Work orders**: the message a publisher sends to transcode workers
//! - **Path utilities**: container extension handling for source recordings
//! - **Error handling**: common error type and result alias
//!
//! # Examples
//!
//! ```
//! use dvrflow_common::{CropRect, FieldOrder, WorkOrder};
//!
//! let order = WorkOrder::builder("/data/show.ts", "show.mkv")
//!     .crop(Some(CropRect::new(0, 72, 0, 72)))
//!     .deinterlace(Some(FieldOrder::Tff))
//!     .build();
//!
//! // crop wins, deinterlacing is dropped
//! assert!(order.interlace_settings.is_none());
//! ```

pub mod error;
pub mod notification;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use notification::{NotificationBatch, RawRecording, Recording, ValidationError, ValidationRules};
pub use types::*;
