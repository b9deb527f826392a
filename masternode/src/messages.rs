//! The five gossip wire messages and their canonical signature preimages.
//!
//! Integers are little-endian, byte strings compact-size prefixed,
//! addresses 16-byte IPv6-mapped plus a big-endian port. Announcements
//! come in two flavors sharing one struct: the extended tag carries
//! reward routing, the legacy tag does not.

use crate::entry::EntryVariant;
use ember_core::codec::{CodecError, Reader, Writer};
use ember_core::{Hash256, OutPoint, PublicKey, Script, Signature, TxIn};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

const TAG_ANNOUNCE: u8 = 0x01;
const TAG_ANNOUNCE_EXT: u8 = 0x02;
const TAG_PING: u8 = 0x03;
const TAG_VOTE: u8 = 0x04;
const TAG_LIST_REQUEST: u8 = 0x05;

/// Reward routing carried only by extended announcements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardFields {
    pub address: Script,
    pub percent: i32,
}

/// Self-declaration of a masternode, initial or updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceMessage {
    pub vin: TxIn,
    pub address: SocketAddr,
    pub signature: Signature,
    pub sig_time: i64,
    pub collateral_pubkey: PublicKey,
    pub operator_pubkey: PublicKey,
    /// -1 on an organic broadcast; the list size on a sync reply.
    pub count: i32,
    pub current: i32,
    pub last_updated: i64,
    pub protocol_version: i32,
    pub reward: Option<RewardFields>,
}

impl AnnounceMessage {
    pub fn variant(&self) -> EntryVariant {
        if self.reward.is_some() {
            EntryVariant::Extended
        } else {
            EntryVariant::Legacy
        }
    }

    /// Canonical byte string the announcement signature covers.
    pub fn preimage(&self) -> Vec<u8> {
        announce_preimage(
            &self.address,
            self.sig_time,
            &self.collateral_pubkey,
            &self.operator_pubkey,
            self.protocol_version,
            self.reward.as_ref(),
        )
    }
}

/// Liveness beacon; `stop` requests removal instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingMessage {
    pub vin: TxIn,
    pub signature: Signature,
    pub sig_time: i64,
    pub stop: bool,
}

/// Governance vote signed by the operator key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteMessage {
    pub vin: TxIn,
    pub signature: Signature,
    pub vote_value: i32,
}

/// Request for the full registry (null vin) or one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequestMessage {
    pub vin: TxIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GossipMessage {
    Announce(AnnounceMessage),
    Ping(PingMessage),
    Vote(VoteMessage),
    ListRequest(ListRequestMessage),
}

impl GossipMessage {
    /// Wire tag name, for logging.
    pub fn tag_name(&self) -> &'static str {
        match self {
            GossipMessage::Announce(m) if m.reward.is_some() => "announce-ext",
            GossipMessage::Announce(_) => "announce",
            GossipMessage::Ping(_) => "ping",
            GossipMessage::Vote(_) => "vote",
            GossipMessage::ListRequest(_) => "list-request",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            GossipMessage::Announce(m) => {
                w.put_u8(if m.reward.is_some() {
                    TAG_ANNOUNCE_EXT
                } else {
                    TAG_ANNOUNCE
                });
                put_txin(&mut w, &m.vin);
                put_addr(&mut w, &m.address);
                w.put_var_bytes(m.signature.as_bytes());
                w.put_i64(m.sig_time);
                w.put_var_bytes(m.collateral_pubkey.as_bytes());
                w.put_var_bytes(m.operator_pubkey.as_bytes());
                w.put_i32(m.count);
                w.put_i32(m.current);
                w.put_i64(m.last_updated);
                w.put_i32(m.protocol_version);
                if let Some(reward) = &m.reward {
                    w.put_var_bytes(reward.address.as_bytes());
                    w.put_i32(reward.percent);
                }
            }
            GossipMessage::Ping(m) => {
                w.put_u8(TAG_PING);
                put_txin(&mut w, &m.vin);
                w.put_var_bytes(m.signature.as_bytes());
                w.put_i64(m.sig_time);
                w.put_bool(m.stop);
            }
            GossipMessage::Vote(m) => {
                w.put_u8(TAG_VOTE);
                put_txin(&mut w, &m.vin);
                w.put_var_bytes(m.signature.as_bytes());
                w.put_i32(m.vote_value);
            }
            GossipMessage::ListRequest(m) => {
                w.put_u8(TAG_LIST_REQUEST);
                put_txin(&mut w, &m.vin);
            }
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let tag = r.get_u8()?;
        let msg = match tag {
            TAG_ANNOUNCE | TAG_ANNOUNCE_EXT => {
                let vin = get_txin(&mut r)?;
                let address = get_addr(&mut r)?;
                let signature = Signature::new(r.get_var_bytes()?);
                let sig_time = r.get_i64()?;
                let collateral_pubkey = PublicKey::new(r.get_var_bytes()?);
                let operator_pubkey = PublicKey::new(r.get_var_bytes()?);
                let count = r.get_i32()?;
                let current = r.get_i32()?;
                let last_updated = r.get_i64()?;
                let protocol_version = r.get_i32()?;
                let reward = if tag == TAG_ANNOUNCE_EXT {
                    let address = Script::new(r.get_var_bytes()?);
                    let percent = r.get_i32()?;
                    Some(RewardFields { address, percent })
                } else {
                    None
                };
                GossipMessage::Announce(AnnounceMessage {
                    vin,
                    address,
                    signature,
                    sig_time,
                    collateral_pubkey,
                    operator_pubkey,
                    count,
                    current,
                    last_updated,
                    protocol_version,
                    reward,
                })
            }
            TAG_PING => GossipMessage::Ping(PingMessage {
                vin: get_txin(&mut r)?,
                signature: Signature::new(r.get_var_bytes()?),
                sig_time: r.get_i64()?,
                stop: r.get_bool()?,
            }),
            TAG_VOTE => GossipMessage::Vote(VoteMessage {
                vin: get_txin(&mut r)?,
                signature: Signature::new(r.get_var_bytes()?),
                vote_value: r.get_i32()?,
            }),
            TAG_LIST_REQUEST => GossipMessage::ListRequest(ListRequestMessage {
                vin: get_txin(&mut r)?,
            }),
            other => return Err(CodecError::UnknownTag(other)),
        };
        r.finish()?;
        Ok(msg)
    }
}

fn put_txin(w: &mut Writer, vin: &TxIn) {
    w.put_raw(vin.prevout.txid.as_bytes());
    w.put_u32(vin.prevout.vout);
    w.put_var_bytes(vin.script_sig.as_bytes());
}

fn get_txin(r: &mut Reader<'_>) -> Result<TxIn, CodecError> {
    let raw: [u8; 32] = r
        .get_raw(32)?
        .try_into()
        .map_err(|_| CodecError::InvalidField("txid"))?;
    let vout = r.get_u32()?;
    let script_sig = Script::new(r.get_var_bytes()?);
    Ok(TxIn {
        prevout: OutPoint::new(Hash256(raw), vout),
        script_sig,
    })
}

fn put_addr(w: &mut Writer, addr: &SocketAddr) {
    let v6 = match addr.ip() {
        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
        IpAddr::V6(v6) => v6,
    };
    w.put_raw(&v6.octets());
    w.put_raw(&addr.port().to_be_bytes());
}

fn get_addr(r: &mut Reader<'_>) -> Result<SocketAddr, CodecError> {
    let octets: [u8; 16] = r
        .get_raw(16)?
        .try_into()
        .map_err(|_| CodecError::InvalidField("address"))?;
    let port_bytes: [u8; 2] = r
        .get_raw(2)?
        .try_into()
        .map_err(|_| CodecError::InvalidField("port"))?;
    let v6 = Ipv6Addr::from(octets);
    let ip = match v6.to_ipv4_mapped() {
        Some(v4) => IpAddr::V4(v4),
        None => IpAddr::V6(v6),
    };
    Ok(SocketAddr::new(ip, u16::from_be_bytes(port_bytes)))
}

/// Canonical announce preimage: textual address, decimal timestamps and
/// version, raw key bytes, hex reward script on the extended variant.
pub fn announce_preimage(
    addr: &SocketAddr,
    sig_time: i64,
    collateral_pubkey: &PublicKey,
    operator_pubkey: &PublicKey,
    protocol_version: i32,
    reward: Option<&RewardFields>,
) -> Vec<u8> {
    let mut m = Vec::new();
    m.extend_from_slice(addr.to_string().as_bytes());
    m.extend_from_slice(sig_time.to_string().as_bytes());
    m.extend_from_slice(collateral_pubkey.as_bytes());
    m.extend_from_slice(operator_pubkey.as_bytes());
    m.extend_from_slice(protocol_version.to_string().as_bytes());
    if let Some(reward) = reward {
        m.extend_from_slice(reward.address.to_string().as_bytes());
        m.extend_from_slice(reward.percent.to_string().as_bytes());
    }
    m
}

/// Canonical ping preimage over the entry's stored address.
pub fn ping_preimage(addr: &SocketAddr, sig_time: i64, stop: bool) -> Vec<u8> {
    let mut m = Vec::new();
    m.extend_from_slice(addr.to_string().as_bytes());
    m.extend_from_slice(sig_time.to_string().as_bytes());
    m.extend_from_slice((stop as u8).to_string().as_bytes());
    m
}

/// Canonical vote preimage.
pub fn vote_preimage(outpoint: &OutPoint, vote_value: i32) -> Vec<u8> {
    let mut m = Vec::new();
    m.extend_from_slice(outpoint.to_string().as_bytes());
    m.extend_from_slice(vote_value.to_string().as_bytes());
    m
}
