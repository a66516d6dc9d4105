use std::fmt;
use tokio::sync::mpsc;

/// Page furnishings loaded as images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Logo,
    NorthArrow,
    QrCode,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Logo => "logo",
            AssetKind::NorthArrow => "north arrow",
            AssetKind::QrCode => "QR code",
        };
        f.write_str(name)
    }
}

/// Notifications sent from the pipeline to whoever displays them
#[derive(Debug, Clone, PartialEq)]
pub enum PrintEvent {
    Completed {
        file_name: String,
    },
    FailedToSave {
        message: String,
    },
    ErrorLoadingImage {
        error: String,
        asset: AssetKind,
    },
    /// Some tiles of an oversized layer request could not be fetched
    TilesIncomplete {
        layer: String,
        failed: usize,
        total: usize,
    },
}

pub type EventSender = mpsc::UnboundedSender<PrintEvent>;

/// Send `event` if anyone is listening
pub(crate) fn notify(events: Option<&EventSender>, event: PrintEvent) {
    if let Some(tx) = events {
        // A closed receiver only means nobody displays notifications anymore
        let _ = tx.send(event);
    }
}
