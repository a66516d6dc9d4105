//! Job-scoped state and the journal of reversible map mutations
//!
//! Every change the pipeline makes to the map goes through
//! [`PrintSession::apply`], which records the mutation. Restoring the map is a
//! single reverse unwind of that journal, whichever path ended the job.

use crate::cancel::CancelToken;
use crate::map::{LayerId, LayerSpec, MapHost, View};
use crate::types::Size;

/// A reversible change to the map
#[derive(Debug, Clone)]
pub enum MapMutation {
    /// Hide a layer without removing it from the collection
    HideLayer { layer: LayerId },
    /// Insert a synthetic layer at a draw-order index
    AddLayer { index: usize, layer: LayerSpec },
    /// Change the map's pixel size
    Resize { original: Size, target: Size },
    /// Swap the active view
    SwapView { original: View, replacement: View },
    /// Hide the print extent preview feature
    HidePreview,
}

impl MapMutation {
    pub fn apply<M: MapHost + ?Sized>(&self, map: &mut M) {
        match self {
            MapMutation::HideLayer { layer } => {
                if !map.set_layer_visible(*layer, false) {
                    log::warn!("Cannot hide layer {}: not in the map", layer);
                }
            }
            MapMutation::AddLayer { index, layer } => map.insert_layer(*index, layer.clone()),
            MapMutation::Resize { target, .. } => map.set_size(*target),
            MapMutation::SwapView { replacement, .. } => map.set_view(replacement.clone()),
            MapMutation::HidePreview => map.set_preview_visible(false),
        }
    }

    pub fn undo<M: MapHost + ?Sized>(&self, map: &mut M) {
        match self {
            MapMutation::HideLayer { layer } => {
                if !map.set_layer_visible(*layer, true) {
                    log::warn!("Cannot show layer {} again: not in the map", layer);
                }
            }
            MapMutation::AddLayer { layer, .. } => {
                if map.remove_layer(layer.id).is_none() {
                    log::warn!("Print layer {} was already removed", layer.id);
                }
            }
            MapMutation::Resize { original, .. } => map.set_size(*original),
            MapMutation::SwapView { original, .. } => map.set_view(original.clone()),
            MapMutation::HidePreview => map.set_preview_visible(true),
        }
    }
}

/// One original layer and the print layer standing in for it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSubstitution {
    pub original: LayerId,
    pub replacement: LayerId,
}

/// State of the active print job
#[derive(Debug)]
pub struct PrintSession {
    original_view: View,
    original_size: Size,
    print_view: Option<View>,
    margin_pt: f32,
    permalink: Option<String>,
    journal: Vec<MapMutation>,
    substitutions: Vec<LayerSubstitution>,
    cancel: CancelToken,
}

impl PrintSession {
    /// Capture the map state a job starts from
    pub fn begin<M: MapHost + ?Sized>(map: &M, margin_pt: f32, cancel: CancelToken) -> Self {
        Self {
            original_view: map.view().clone(),
            original_size: map.size(),
            print_view: None,
            margin_pt,
            permalink: map.permalink(),
            journal: Vec::new(),
            substitutions: Vec::new(),
            cancel,
        }
    }

    /// Apply a mutation to the map and record it for restoration
    pub fn apply<M: MapHost + ?Sized>(&mut self, map: &mut M, mutation: MapMutation) {
        mutation.apply(map);
        if let MapMutation::SwapView { replacement, .. } = &mutation {
            self.print_view = Some(replacement.clone());
        }
        self.journal.push(mutation);
    }

    pub fn record_substitution(&mut self, substitution: LayerSubstitution) {
        self.substitutions.push(substitution);
    }

    /// Undo every recorded mutation, newest first.
    ///
    /// Returns the number of mutations undone. Calling it again is a no-op.
    pub fn restore<M: MapHost + ?Sized>(&mut self, map: &mut M) -> usize {
        let count = self.journal.len();
        while let Some(mutation) = self.journal.pop() {
            mutation.undo(map);
        }
        self.substitutions.clear();
        self.print_view = None;
        if count > 0 {
            log::debug!("Restored {} map mutations", count);
        }
        count
    }

    /// Whether nothing is left to restore
    pub fn is_drained(&self) -> bool {
        self.journal.is_empty() && self.substitutions.is_empty()
    }

    pub fn original_view(&self) -> &View {
        &self.original_view
    }

    pub fn original_size(&self) -> Size {
        self.original_size
    }

    pub fn print_view(&self) -> Option<&View> {
        self.print_view.as_ref()
    }

    pub fn margin_pt(&self) -> f32 {
        self.margin_pt
    }

    /// Shareable map link captured before the map was touched
    pub fn permalink(&self) -> Option<&str> {
        self.permalink.as_deref()
    }

    pub fn substitutions(&self) -> &[LayerSubstitution] {
        &self.substitutions
    }

    /// Originals currently hidden by this session
    pub fn hidden_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.journal.iter().filter_map(|m| match m {
            MapMutation::HideLayer { layer } => Some(*layer),
            _ => None,
        })
    }

    /// Print layers currently added by this session
    pub fn added_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.journal.iter().filter_map(|m| match m {
            MapMutation::AddLayer { layer, .. } => Some(layer.id),
            _ => None,
        })
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{CanvasLayer, LayerSource, MapError, Projection};
    use futures::future::BoxFuture;

    struct StubMap {
        view: View,
        size: Size,
        layers: Vec<LayerSpec>,
        preview: bool,
    }

    impl MapHost for StubMap {
        fn view(&self) -> &View {
            &self.view
        }
        fn set_view(&mut self, view: View) {
            self.view = view;
        }
        fn size(&self) -> Size {
            self.size
        }
        fn set_size(&mut self, size: Size) {
            self.size = size;
        }
        fn layers(&self) -> &[LayerSpec] {
            &self.layers
        }
        fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
            match self.layers.iter_mut().find(|l| l.id == id) {
                Some(layer) => {
                    layer.visible = visible;
                    true
                }
                None => false,
            }
        }
        fn insert_layer(&mut self, index: usize, layer: LayerSpec) {
            let index = index.min(self.layers.len());
            self.layers.insert(index, layer);
        }
        fn remove_layer(&mut self, id: LayerId) -> Option<LayerSpec> {
            let index = self.layer_index(id)?;
            Some(self.layers.remove(index))
        }
        fn render(&mut self) -> BoxFuture<'_, Result<(), MapError>> {
            Box::pin(async { Ok(()) })
        }
        fn canvas_layers(&self) -> &[CanvasLayer] {
            &[]
        }
        fn set_preview_visible(&mut self, visible: bool) {
            self.preview = visible;
        }
    }

    fn stub_map() -> StubMap {
        let other = |id| {
            LayerSpec::new(
                LayerId(id),
                "vector",
                LayerSource::Other {
                    kind: "vector".to_string(),
                },
            )
        };
        StubMap {
            view: View::new([0.0, 0.0], 1.0, Projection::new("EPSG:3857", 1.0)),
            size: Size::new(100, 80),
            layers: vec![other(1), other(2)],
            preview: true,
        }
    }

    #[test]
    fn test_restore_unwinds_in_reverse() {
        let mut map = stub_map();
        let original_view = map.view.id();
        let mut session = PrintSession::begin(&map, 10.0, CancelToken::never());

        let print_layer = LayerSpec::new(
            LayerId(3),
            "print",
            LayerSource::Other {
                kind: "image".to_string(),
            },
        );
        session.apply(&mut map, MapMutation::HideLayer { layer: LayerId(1) });
        session.apply(
            &mut map,
            MapMutation::AddLayer {
                index: 0,
                layer: print_layer,
            },
        );
        session.record_substitution(LayerSubstitution {
            original: LayerId(1),
            replacement: LayerId(3),
        });
        let original = map.view.clone();
        let replacement = original.derive(0.001);
        session.apply(
            &mut map,
            MapMutation::SwapView {
                original,
                replacement,
            },
        );
        session.apply(&mut map, MapMutation::HidePreview);

        assert_eq!(session.hidden_layers().collect::<Vec<_>>(), vec![LayerId(1)]);
        assert_eq!(session.added_layers().collect::<Vec<_>>(), vec![LayerId(3)]);
        assert_eq!(session.substitutions().len(), 1);
        assert_eq!(session.print_view().map(View::id), Some(map.view.id()));
        assert_eq!(map.layers[0].id, LayerId(3));
        assert!(!map.preview);

        assert_eq!(session.restore(&mut map), 4);
        assert!(session.is_drained());
        assert!(session.print_view().is_none());
        assert_eq!(map.view.id(), original_view);
        assert_eq!(
            map.layers.iter().map(|l| (l.id, l.visible)).collect::<Vec<_>>(),
            vec![(LayerId(1), true), (LayerId(2), true)]
        );
        assert!(map.preview);

        // Second unwind has nothing left to do
        assert_eq!(session.restore(&mut map), 0);
    }

    #[test]
    fn test_missing_layer_is_tolerated() {
        let mut map = stub_map();
        let mut session = PrintSession::begin(&map, 0.0, CancelToken::never());
        session.apply(&mut map, MapMutation::HideLayer { layer: LayerId(99) });
        assert_eq!(session.restore(&mut map), 1);
        assert_eq!(session.original_size(), Size::new(100, 80));
        assert_eq!(session.original_view().id(), map.view.id());
    }
}
