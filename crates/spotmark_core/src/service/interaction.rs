//! Map and editing-surface event dispatch.
//!
//! Hosts forward raw UI events here instead of calling session operations
//! directly, and get back whether the editing modal should be visible.

use crate::model::marker::{Coordinate, MarkerKey};
use crate::repo::marker_store::MarkerStore;
use crate::service::marker_session::{MarkerSession, SessionError};

/// Events emitted by the map surface.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Long press on empty map area.
    LongPress(Coordinate),
    /// Tap on an existing marker callout.
    MarkerActivate(MarkerKey),
}

/// Buttons of the editing modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    Save(String),
    Delete,
    Close,
}

/// Visibility of the editing modal after an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorState {
    Closed,
    Open { key: MarkerKey, draft_name: String },
}

impl EditorState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

impl<S: MarkerStore> MarkerSession<S> {
    /// Current editing modal state.
    pub fn editor_state(&self) -> EditorState {
        match self.active_edit() {
            Some(active) => EditorState::Open {
                key: active.key.clone(),
                draft_name: active.draft_name.clone(),
            },
            None => EditorState::Closed,
        }
    }

    /// Routes a map event: long press creates, marker tap begins an edit.
    pub fn handle_map_event(&mut self, event: MapEvent) -> Result<EditorState, SessionError> {
        match event {
            MapEvent::LongPress(coordinate) => {
                self.create_marker_at(coordinate)?;
            }
            MapEvent::MarkerActivate(key) => {
                self.begin_edit(&key)?;
            }
        }
        Ok(self.editor_state())
    }

    /// Routes an editing modal action.
    ///
    /// On error the modal state is unchanged, so an `EmptyName` keeps the
    /// form open for correction.
    pub fn handle_edit_action(&mut self, action: EditAction) -> Result<EditorState, SessionError> {
        match action {
            EditAction::Save(text) => {
                self.commit_edit(&text)?;
            }
            EditAction::Delete => {
                self.delete_active()?;
            }
            EditAction::Close => self.cancel_edit(),
        }
        Ok(self.editor_state())
    }
}
