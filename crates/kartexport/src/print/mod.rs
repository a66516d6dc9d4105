//! The print pipeline
//!
//! One job runs through these states:
//!
//! ```text
//! Idle → Preparing → WaitingForRender → Compositing → BuildingDocument
//!      → Encoding → Saving → Restoring → Idle
//! ```
//!
//! Cancellation is honored while waiting for the render and during
//! compositing; it short-cuts to `Restoring` and the job resolves to `None`.
//! `Restoring` runs on every exit path.

mod assets;
mod capture;
mod document;
mod exchange;
mod session;
mod view_state;

pub use assets::{PageAssets, load_assets, qr_code_image};
pub use capture::capture_canvas;
pub use document::{Margins, PageLayout, build_document, draw_page};
pub use exchange::{LayerExchanger, PrintImageLoader};
pub use session::{LayerSubstitution, MapMutation, PrintSession};
pub use view_state::ViewStateManager;

use crate::cancel::CancelToken;
use crate::config::PrintConfig;
use crate::constants::raster_scale_for_dpi;
use crate::events::{EventSender, PrintEvent, notify};
use crate::fetch::ImageFetcher;
use crate::map::MapHost;
use crate::options::PrintJobOptions;
use crate::render::{PageRasterizer, encode_pdf, encode_png};
use crate::types::{OutputType, PrintError, Result};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the composer is in a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintState {
    #[default]
    Idle,
    Preparing,
    WaitingForRender,
    Compositing,
    BuildingDocument,
    Encoding,
    Saving,
    Restoring,
    Cancelled,
}

impl fmt::Display for PrintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Result of a finished job
#[derive(Debug, Clone)]
pub struct PrintOutput {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// Location of the saved file; `None` for blob output
    pub path: Option<PathBuf>,
    pub output_type: OutputType,
}

impl PrintOutput {
    pub fn mime_type(&self) -> &'static str {
        self.output_type.mime_type()
    }
}

/// Runs print jobs against one map
pub struct PrintComposer<M: MapHost> {
    map: M,
    fetcher: Arc<dyn ImageFetcher>,
    config: PrintConfig,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    events: Option<EventSender>,
    view_state: ViewStateManager,
    state: PrintState,
    session: Option<PrintSession>,
}

impl<M: MapHost> PrintComposer<M> {
    pub fn new(map: M, fetcher: Arc<dyn ImageFetcher>, config: PrintConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            map,
            fetcher,
            view_state: ViewStateManager::new(config.min_print_resolution),
            config,
            rasterizer: default_rasterizer(),
            events: None,
            state: PrintState::Idle,
            session: None,
        })
    }

    /// Use `rasterizer` for PNG and blob output
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    /// Send notifications to `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn into_map(self) -> M {
        self.map
    }

    pub fn config(&self) -> &PrintConfig {
        &self.config
    }

    pub fn state(&self) -> PrintState {
        self.state
    }

    /// Whether a job left map mutations behind (its future was dropped)
    pub fn has_stale_session(&self) -> bool {
        self.session.is_some()
    }

    fn set_state(&mut self, state: PrintState) {
        log::debug!("Print state: {} → {}", self.state, state);
        self.state = state;
    }

    /// Run one print job.
    ///
    /// Resolves to `Ok(None)` when the job was cancelled. The map is back in
    /// its original state whenever this returns.
    pub async fn print(
        &mut self,
        options: &PrintJobOptions,
        cancel: CancelToken,
    ) -> Result<Option<PrintOutput>> {
        options.validate()?;
        self.recover_stale_session();

        self.set_state(PrintState::Preparing);
        if let Err(e) = self.view_state.check_resolution(self.map.view(), options) {
            self.set_state(PrintState::Idle);
            return Err(e);
        }

        log::info!(
            "Printing {} {:?} at {} dpi, 1:{}, as {:?}",
            options.format.name(),
            options.orientation,
            options.resolution,
            options.scale,
            options.save_as
        );

        let layout = PageLayout::new(options);
        self.session = Some(PrintSession::begin(
            &self.map,
            layout.margin_pt(),
            cancel.clone(),
        ));

        let result = self.run_job(options, &cancel).await;

        self.set_state(PrintState::Restoring);
        self.restore();
        self.set_state(PrintState::Idle);

        match &result {
            Ok(Some(output)) => {
                log::info!("Print finished: {}", output.file_name);
                notify(
                    self.events.as_ref(),
                    PrintEvent::Completed {
                        file_name: output.file_name.clone(),
                    },
                );
            }
            Ok(None) => log::info!("Print cancelled"),
            Err(e) => {
                log::error!("Print failed: {}", e);
                notify(
                    self.events.as_ref(),
                    PrintEvent::FailedToSave {
                        message: e.to_string(),
                    },
                );
            }
        }

        result
    }

    async fn run_job(
        &mut self,
        options: &PrintJobOptions,
        cancel: &CancelToken,
    ) -> Result<Option<PrintOutput>> {
        let Some(session) = self.session.as_mut() else {
            return Err(PrintError::Config("No active print session".to_string()));
        };

        let exchanger = LayerExchanger::new(
            Arc::clone(&self.fetcher),
            self.config.max_tile_size,
            self.events.clone(),
        );
        let swapped = exchanger.exchange(&mut self.map, session, options.resolution);
        self.view_state.apply(&mut self.map, session, options)?;
        let permalink = session.permalink().map(str::to_string);
        log::debug!("Prepared map: {} layers swapped for printing", swapped);

        // Render
        self.set_state(PrintState::WaitingForRender);
        let rendered = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.map.render() => Some(result),
        };
        match rendered {
            Some(result) => result?,
            None => {
                self.set_state(PrintState::Cancelled);
                return Ok(None);
            }
        }
        if cancel.is_cancelled() {
            self.set_state(PrintState::Cancelled);
            return Ok(None);
        }

        // Capture
        self.set_state(PrintState::Compositing);
        let settled = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.config.settle_delay()) => true,
        };
        if !settled {
            self.set_state(PrintState::Cancelled);
            return Ok(None);
        }
        let background = self
            .map
            .background()
            .unwrap_or_else(|| self.config.background_color().to_rgba());
        let map_image = capture_canvas(self.map.size(), self.map.canvas_layers(), background);

        // Document
        self.set_state(PrintState::BuildingDocument);
        let assets = load_assets(
            self.fetcher.as_ref(),
            &self.config,
            options,
            permalink.as_deref(),
            self.events.as_ref(),
        )
        .await;
        let job = options.clone();
        let document =
            tokio::task::spawn_blocking(move || build_document(&job, &map_image, &assets))
                .await??;

        // Encode
        self.set_state(PrintState::Encoding);
        let output_type = options.save_as;
        let dpi = options.resolution;
        let rasterizer = self.rasterizer.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            let pdf = encode_pdf(document)?;
            if !output_type.is_raster() {
                return Ok(pdf);
            }
            let rasterizer = rasterizer.ok_or_else(|| {
                PrintError::Encode("No rasterizer available for PNG output".to_string())
            })?;
            let bitmap = rasterizer.rasterize(&pdf, raster_scale_for_dpi(dpi))?;
            encode_png(&bitmap)
        })
        .await??;

        // Save
        self.set_state(PrintState::Saving);
        let file_name = self
            .config
            .file_name(&chrono::Local::now(), output_type)?;
        let path = match output_type {
            OutputType::Blob => None,
            OutputType::Pdf | OutputType::Png => Some(self.save(&file_name, &bytes).await?),
        };

        Ok(Some(PrintOutput {
            bytes,
            file_name,
            path,
            output_type,
        }))
    }

    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = match &self.config.output_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                dir.join(file_name)
            }
            None => PathBuf::from(file_name),
        };
        tokio::fs::write(&path, bytes).await?;
        log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Unwind the active session, if any
    fn restore(&mut self) {
        if let Some(mut session) = self.session.take() {
            let undone = session.restore(&mut self.map);
            log::debug!("Map restored ({} mutations undone)", undone);
        }
    }

    fn recover_stale_session(&mut self) {
        if self.session.is_some() {
            log::warn!("Previous print job did not finish, restoring the map first");
            self.restore();
            self.state = PrintState::Idle;
        }
    }
}

#[cfg(all(feature = "pdfium", not(target_arch = "wasm32")))]
fn default_rasterizer() -> Option<Arc<dyn PageRasterizer>> {
    Some(Arc::new(crate::render::PdfiumRasterizer::new()))
}

#[cfg(not(all(feature = "pdfium", not(target_arch = "wasm32"))))]
fn default_rasterizer() -> Option<Arc<dyn PageRasterizer>> {
    None
}
