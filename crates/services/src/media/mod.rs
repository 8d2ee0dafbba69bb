pub mod audio_session;
pub mod speaking;
pub mod token;

pub use audio_session::{
    AudioSession, AudioSessionError, AudioTransport, MediaKind, RemoteEvent, RemoteParticipant,
    SessionCredentials, SpeakingStatusSink, TrackId,
};
pub use speaking::HttpSpeakingSink;
pub use token::{build_rtc_token, IssuedToken, TokenError};
