//! Agora AccessToken2 ("007") minting for the RTC service.
//!
//! Layout of the signed content, all integers little-endian and every string
//! prefixed with its `u16` length:
//!
//! ```text
//! signature | app_id | issue_ts:u32 | expire:u32 | salt:u32 | services:u16 | service*
//! service   = type:u16 | privileges:u16 | (privilege:u16 expire:u32)* | channel | uid
//! ```
//!
//! The token is `"007"` followed by the base64 of the zlib-deflated content.

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use thiserror::Error;
use voxroom_config::AgoraSettings;

pub const VERSION: &str = "007";
pub const SERVICE_RTC: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum RtcPrivilege {
    JoinChannel = 1,
    PublishAudioStream = 2,
    PublishVideoStream = 3,
    PublishDataStream = 4,
}

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("Audio transport credentials are not configured")]
    NotConfigured,
    #[error("App id and certificate must be 32 hex characters")]
    InvalidCredentials,
    #[error("Token field too long")]
    FieldTooLong,
    #[error("Malformed token: {0}")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RtcService {
    pub channel_name: String,
    pub uid: String,
    /// Privilege id to expiry, in seconds relative to issuance.
    pub privileges: BTreeMap<u16, u32>,
}

impl RtcService {
    pub fn new(channel_name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            uid: uid.into(),
            privileges: BTreeMap::new(),
        }
    }

    pub fn add_privilege(&mut self, privilege: RtcPrivilege, expire: u32) {
        self.privileges.insert(privilege as u16, expire);
    }

    fn pack(&self, buf: &mut Vec<u8>) -> Result<(), TokenError> {
        put_u16(buf, SERVICE_RTC);
        put_u16(buf, self.privileges.len() as u16);
        for (privilege, expire) in &self.privileges {
            put_u16(buf, *privilege);
            put_u32(buf, *expire);
        }
        put_string(buf, self.channel_name.as_bytes())?;
        put_string(buf, self.uid.as_bytes())
    }
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub app_id: String,
    pub issue_ts: u32,
    pub expire: u32,
    pub salt: u32,
    pub services: Vec<RtcService>,
}

impl AccessToken {
    pub fn new(app_id: impl Into<String>, issue_ts: u32, expire: u32, salt: u32) -> Self {
        Self {
            app_id: app_id.into(),
            issue_ts,
            expire,
            salt,
            services: Vec::new(),
        }
    }

    pub fn add_service(&mut self, service: RtcService) {
        self.services.push(service);
    }

    pub fn build(&self, app_certificate: &str) -> Result<String, TokenError> {
        if !is_hex32(&self.app_id) || !is_hex32(app_certificate) {
            return Err(TokenError::InvalidCredentials);
        }

        let info = self.signing_info()?;
        let signature = hmac_sha256(&self.signing_key(app_certificate)?, &info)?;

        let mut content = Vec::with_capacity(signature.len() + 2 + info.len());
        put_string(&mut content, &signature)?;
        content.extend_from_slice(&info);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&content)
            .and_then(|_| encoder.finish())
            .map(|compressed| format!("{VERSION}{}", STANDARD.encode(compressed)))
            .map_err(|_| TokenError::Malformed("compression failed"))
    }

    /// Decodes a token without checking its signature.
    pub fn parse(token: &str) -> Result<(Self, Vec<u8>), TokenError> {
        let encoded = token
            .strip_prefix(VERSION)
            .ok_or(TokenError::Malformed("unknown version"))?;
        let compressed = STANDARD
            .decode(encoded)
            .map_err(|_| TokenError::Malformed("invalid base64"))?;
        let mut content = Vec::new();
        ZlibDecoder::new(compressed.as_slice())
            .read_to_end(&mut content)
            .map_err(|_| TokenError::Malformed("invalid deflate stream"))?;

        let mut reader = Reader { buf: &content };
        let signature = reader.string()?.to_vec();
        let app_id = String::from_utf8(reader.string()?.to_vec())
            .map_err(|_| TokenError::Malformed("app id is not utf-8"))?;
        let mut token = AccessToken::new(app_id, reader.u32()?, reader.u32()?, reader.u32()?);

        for _ in 0..reader.u16()? {
            if reader.u16()? != SERVICE_RTC {
                return Err(TokenError::Malformed("unsupported service"));
            }
            let mut privileges = BTreeMap::new();
            for _ in 0..reader.u16()? {
                let privilege = reader.u16()?;
                privileges.insert(privilege, reader.u32()?);
            }
            let channel_name = reader.utf8()?;
            let uid = reader.utf8()?;
            token.add_service(RtcService {
                channel_name,
                uid,
                privileges,
            });
        }
        Ok((token, signature))
    }

    pub fn verify(&self, signature: &[u8], app_certificate: &str) -> Result<bool, TokenError> {
        let expected = hmac_sha256(&self.signing_key(app_certificate)?, &self.signing_info()?)?;
        Ok(expected == signature)
    }

    fn signing_key(&self, app_certificate: &str) -> Result<Vec<u8>, TokenError> {
        let step = hmac_sha256(&self.issue_ts.to_le_bytes(), app_certificate.as_bytes())?;
        hmac_sha256(&self.salt.to_le_bytes(), &step)
    }

    fn signing_info(&self) -> Result<Vec<u8>, TokenError> {
        let mut buf = Vec::new();
        put_string(&mut buf, self.app_id.as_bytes())?;
        put_u32(&mut buf, self.issue_ts);
        put_u32(&mut buf, self.expire);
        put_u32(&mut buf, self.salt);
        put_u16(&mut buf, self.services.len() as u16);
        for service in &self.services {
            service.pack(&mut buf)?;
        }
        Ok(buf)
    }
}

/// A token ready to hand to a client.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub app_id: String,
    pub channel_name: String,
    pub uid: String,
    /// Unix seconds.
    pub expires_at: u64,
}

/// Publisher token for `channel_name` bound to `uid`. Token and privileges
/// both expire `token_ttl_secs` after issuance.
pub fn build_rtc_token(
    settings: &AgoraSettings,
    channel_name: &str,
    uid: &str,
) -> Result<IssuedToken, TokenError> {
    if !settings.is_configured() {
        return Err(TokenError::NotConfigured);
    }

    let issue_ts = chrono::Utc::now().timestamp() as u32;
    let salt = rand::random_range(1..=99_999_999);
    let ttl = settings.token_ttl_secs;

    let mut service = RtcService::new(channel_name, uid);
    for privilege in [
        RtcPrivilege::JoinChannel,
        RtcPrivilege::PublishAudioStream,
        RtcPrivilege::PublishVideoStream,
        RtcPrivilege::PublishDataStream,
    ] {
        service.add_privilege(privilege, ttl);
    }
    let mut token = AccessToken::new(&settings.app_id, issue_ts, ttl, salt);
    token.add_service(service);

    Ok(IssuedToken {
        token: token.build(&settings.app_certificate)?,
        app_id: settings.app_id.clone(),
        channel_name: channel_name.to_string(),
        uid: uid.to_string(),
        expires_at: u64::from(issue_ts) + u64::from(ttl),
    })
}

fn is_hex32(value: &str) -> bool {
    value.len() == 32 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| TokenError::Malformed("invalid signing key"))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn put_string(buf: &mut Vec<u8>, value: &[u8]) -> Result<(), TokenError> {
    let len = u16::try_from(value.len()).map_err(|_| TokenError::FieldTooLong)?;
    put_u16(buf, len);
    buf.extend_from_slice(value);
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], TokenError> {
        if self.buf.len() < n {
            return Err(TokenError::Malformed("truncated"));
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    fn u16(&mut self) -> Result<u16, TokenError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, TokenError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn string(&mut self) -> Result<&'a [u8], TokenError> {
        let len = self.u16()? as usize;
        self.take(len)
    }

    fn utf8(&mut self) -> Result<String, TokenError> {
        String::from_utf8(self.string()?.to_vec())
            .map_err(|_| TokenError::Malformed("string is not utf-8"))
    }
}
