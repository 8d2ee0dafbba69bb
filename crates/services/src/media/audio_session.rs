//! Client-side bridge between a room view and the third-party audio channel.
//!
//! The transport itself is opaque: anything that can join a channel, publish
//! a microphone track and report remote publications implements
//! [`AudioTransport`]. The session keeps the local roster and mirrors the
//! microphone state into the room's speaking indicator.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const FULL_VOLUME: u8 = 100;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioSessionError {
    #[error("Audio transport error: {0}")]
    Transport(String),
    #[error("Speaking status update failed: {0}")]
    Sink(String),
    #[error("Audio session is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Remote participant activity reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    Joined { uid: String },
    Published { uid: String, kind: MediaKind },
    Unpublished { uid: String, kind: MediaKind },
    Left { uid: String },
}

#[async_trait]
pub trait AudioTransport: Send + Sync {
    async fn join(
        &self,
        app_id: &str,
        channel: &str,
        token: &str,
        uid: &str,
    ) -> Result<(), AudioSessionError>;
    async fn create_microphone_track(&self) -> Result<TrackId, AudioSessionError>;
    async fn publish(&self, track: TrackId) -> Result<(), AudioSessionError>;
    async fn subscribe(&self, uid: &str, kind: MediaKind) -> Result<(), AudioSessionError>;
    async fn set_track_muted(&self, track: TrackId, muted: bool) -> Result<(), AudioSessionError>;
    async fn set_remote_volume(&self, uid: &str, volume: u8) -> Result<(), AudioSessionError>;
    async fn close_track(&self, track: TrackId) -> Result<(), AudioSessionError>;
    async fn leave(&self) -> Result<(), AudioSessionError>;
}

/// Where the local microphone state is published for other room viewers.
#[async_trait]
pub trait SpeakingStatusSink: Send + Sync {
    async fn update_speaking_status(
        &self,
        room_id: &str,
        is_speaking: bool,
    ) -> Result<(), AudioSessionError>;
}

/// Everything needed to join: the room id doubles as the channel name.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub app_id: String,
    pub room_id: String,
    pub token: String,
    pub uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParticipant {
    pub uid: String,
    pub has_audio: bool,
}

pub struct AudioSession {
    transport: Arc<dyn AudioTransport>,
    sink: Arc<dyn SpeakingStatusSink>,
    room_id: String,
    local_track: Option<TrackId>,
    muted: bool,
    speakers_muted: bool,
    roster: BTreeMap<String, RemoteParticipant>,
    closed: bool,
}

impl AudioSession {
    /// Joins the channel and publishes a muted microphone track. A failure
    /// after joining leaves the channel again before returning.
    pub async fn activate(
        transport: Arc<dyn AudioTransport>,
        sink: Arc<dyn SpeakingStatusSink>,
        credentials: SessionCredentials,
    ) -> Result<Self, AudioSessionError> {
        transport
            .join(
                &credentials.app_id,
                &credentials.room_id,
                &credentials.token,
                &credentials.uid,
            )
            .await?;

        let mut session = Self {
            transport,
            sink,
            room_id: credentials.room_id,
            local_track: None,
            muted: true,
            speakers_muted: false,
            roster: BTreeMap::new(),
            closed: false,
        };

        if let Err(e) = session.publish_microphone().await {
            if let Err(close_err) = session.close().await {
                warn!(error = %close_err, "Teardown after failed activation also failed");
            }
            return Err(e);
        }
        debug!(room_id = %session.room_id, "Audio session active");
        Ok(session)
    }

    async fn publish_microphone(&mut self) -> Result<(), AudioSessionError> {
        let track = self.transport.create_microphone_track().await?;
        self.local_track = Some(track);
        self.transport.set_track_muted(track, true).await?;
        self.transport.publish(track).await
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn speakers_muted(&self) -> bool {
        self.speakers_muted
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn roster(&self) -> impl Iterator<Item = &RemoteParticipant> {
        self.roster.values()
    }

    fn speaker_volume(&self) -> u8 {
        if self.speakers_muted { 0 } else { FULL_VOLUME }
    }

    pub async fn handle_event(&mut self, event: RemoteEvent) -> Result<(), AudioSessionError> {
        if self.closed {
            return Err(AudioSessionError::Closed);
        }

        match event {
            RemoteEvent::Joined { uid } => {
                self.roster.entry(uid.clone()).or_insert(RemoteParticipant {
                    uid,
                    has_audio: false,
                });
            }
            RemoteEvent::Published {
                uid,
                kind: MediaKind::Audio,
            } => {
                self.transport.subscribe(&uid, MediaKind::Audio).await?;
                self.transport
                    .set_remote_volume(&uid, self.speaker_volume())
                    .await?;
                self.roster
                    .entry(uid.clone())
                    .or_insert(RemoteParticipant {
                        uid,
                        has_audio: false,
                    })
                    .has_audio = true;
            }
            RemoteEvent::Published {
                kind: MediaKind::Video,
                ..
            } => {}
            RemoteEvent::Unpublished { uid, .. } | RemoteEvent::Left { uid } => {
                self.roster.remove(&uid);
            }
        }
        Ok(())
    }

    /// Flips the local microphone and mirrors the result into the room's
    /// speaking indicator. Returns the new muted state.
    pub async fn toggle_mute(&mut self) -> Result<bool, AudioSessionError> {
        if self.closed {
            return Err(AudioSessionError::Closed);
        }
        let Some(track) = self.local_track else {
            return Err(AudioSessionError::Closed);
        };

        let muted = !self.muted;
        self.transport.set_track_muted(track, muted).await?;
        self.muted = muted;
        self.sink
            .update_speaking_status(&self.room_id, !muted)
            .await?;
        Ok(muted)
    }

    /// Silences or restores every remote participant locally. Nothing is
    /// reported to the server. Returns the new state.
    pub async fn toggle_speakers(&mut self) -> Result<bool, AudioSessionError> {
        if self.closed {
            return Err(AudioSessionError::Closed);
        }
        self.speakers_muted = !self.speakers_muted;
        let volume = self.speaker_volume();
        for participant in self.roster.values().filter(|p| p.has_audio) {
            self.transport
                .set_remote_volume(&participant.uid, volume)
                .await?;
        }
        Ok(self.speakers_muted)
    }

    /// Closes the microphone and leaves the channel. Safe to call more than
    /// once. Both steps are attempted even if the first fails.
    pub async fn close(&mut self) -> Result<(), AudioSessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.roster.clear();

        let mut first_error = None;
        if let Some(track) = self.local_track.take() {
            if let Err(e) = self.transport.close_track(track).await {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.transport.leave().await {
            first_error.get_or_insert(e);
        }
        if !self.muted {
            self.muted = true;
            if let Err(e) = self.sink.update_speaking_status(&self.room_id, false).await {
                warn!(room_id = %self.room_id, error = %e, "Could not clear speaking status");
            }
        }

        debug!(room_id = %self.room_id, "Audio session closed");
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for AudioSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(room_id = %self.room_id, "Audio session dropped outside a runtime");
            return;
        };

        let transport = self.transport.clone();
        let sink = self.sink.clone();
        let was_live = !self.muted;
        let track = self.local_track.take();
        let room_id = std::mem::take(&mut self.room_id);
        self.closed = true;
        self.muted = true;
        handle.spawn(async move {
            if let Some(track) = track {
                if let Err(e) = transport.close_track(track).await {
                    warn!(%room_id, error = %e, "Closing dropped microphone track failed");
                }
            }
            if let Err(e) = transport.leave().await {
                warn!(%room_id, error = %e, "Leaving channel of dropped session failed");
            }
            if was_live {
                if let Err(e) = sink.update_speaking_status(&room_id, false).await {
                    warn!(%room_id, error = %e, "Could not clear speaking status");
                }
            }
        });
    }
}
