//! RFC-limited DNS value types.
//!
//! - RFC 1035: Domain Names - Implementation and Specification
//! - RFC 2181: Clarifications to the DNS Specification
//!
//! | Field | Limit | Reference |
//! |-------|-------|-----------|
//! | Label | 1-63 octets | RFC 1035 §2.3.4 |
//! | Domain name | ≤255 octets | RFC 1035 §2.3.4 |
//! | TTL | 0 to 2^31-1 seconds | RFC 2181 §8 |
//! | TYPE | 16-bit unsigned | RFC 1035 §3.2.2 |

use core::fmt;

/// Maximum length of a single DNS label (RFC 1035 §2.3.4).
pub const MAX_LABEL_LEN: usize = 63;

/// Maximum length of a full domain name in wire format (RFC 1035 §2.3.4).
pub const MAX_DOMAIN_LEN: usize = 255;

/// Maximum TTL value per RFC 2181 §8: 2^31 - 1 seconds.
pub const MAX_TTL: u32 = 2_147_483_647;

/// A domain name stored in wire format.
///
/// Remembers whether it was written fully qualified (with a trailing dot),
/// since providers treat `docs.example.com` and `docs.example.com.`
/// differently in record content.
#[derive(Clone)]
pub struct DomainName {
    /// Length of the wire-format data, terminating zero included.
    len: u8,
    data: [u8; MAX_DOMAIN_LEN],
    absolute: bool,
}

impl DomainName {
    /// Parses a dotted name such as `docs.example.com.`.
    ///
    /// Returns `None` for empty labels, labels over 63 octets or names over
    /// 255 octets. `""` and `"."` are the root.
    pub fn from_dotted(s: &str) -> Option<Self> {
        let absolute = s.ends_with('.');
        let body = s.strip_suffix('.').unwrap_or(s);

        let mut data = [0u8; MAX_DOMAIN_LEN];
        let mut pos = 0usize;

        if !body.is_empty() {
            for label in body.split('.') {
                let bytes = label.as_bytes();
                if bytes.is_empty() || bytes.len() > MAX_LABEL_LEN {
                    return None;
                }
                // length octet + label + room for the terminating zero
                if pos + 1 + bytes.len() >= MAX_DOMAIN_LEN {
                    return None;
                }
                data[pos] = bytes.len() as u8;
                pos += 1;
                data[pos..pos + bytes.len()].copy_from_slice(bytes);
                pos += bytes.len();
            }
        }

        data[pos] = 0;
        pos += 1;

        Some(Self {
            len: pos as u8,
            data,
            absolute: absolute || body.is_empty(),
        })
    }

    /// Iterates over the labels, leftmost first.
    pub fn labels(&self) -> Labels<'_> {
        Labels {
            wire: self.as_wire_bytes(),
        }
    }

    /// Returns the number of labels (0 for the root).
    pub fn label_count(&self) -> usize {
        self.labels().count()
    }

    /// Returns the name in dotted notation without a trailing dot.
    pub fn to_dotted(&self) -> String {
        let mut result = String::with_capacity(self.wire_len());
        for label in self.labels() {
            if !result.is_empty() {
                result.push('.');
            }
            result.push_str(&String::from_utf8_lossy(label));
        }
        result
    }

    /// Returns true if the name was written with a trailing dot.
    #[inline]
    pub const fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns true if this is the root domain.
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.len == 1
    }

    #[inline]
    pub const fn wire_len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn as_wire_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Returns true if `self` equals `zone` or lies below it.
    /// Labels compare ASCII case-insensitively.
    pub fn is_within(&self, zone: &DomainName) -> bool {
        self.strip_zone(zone).is_some()
    }

    /// Returns the labels of `self` left of `zone`, dotted, or `"@"` when the
    /// names are equal. `None` if `self` is not inside `zone`.
    pub fn relative_to(&self, zone: &DomainName) -> Option<String> {
        let prefix = self.strip_zone(zone)?;
        if prefix.is_empty() {
            return Some("@".to_string());
        }
        Some(
            prefix
                .iter()
                .map(|l| String::from_utf8_lossy(l).into_owned())
                .collect::<Vec<_>>()
                .join("."),
        )
    }

    fn strip_zone<'a>(&'a self, zone: &DomainName) -> Option<Vec<&'a [u8]>> {
        let own: Vec<&[u8]> = self.labels().collect();
        let theirs: Vec<&[u8]> = zone.labels().collect();
        if theirs.len() > own.len() {
            return None;
        }
        let split = own.len() - theirs.len();
        let suffix_matches = own[split..]
            .iter()
            .zip(&theirs)
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
        suffix_matches.then(|| own[..split].to_vec())
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.label_count() == other.label_count()
            && self
                .labels()
                .zip(other.labels())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for DomainName {}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainName({:?})", self.to_string())
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        write!(f, "{}", self.to_dotted())?;
        if self.absolute {
            write!(f, ".")?;
        }
        Ok(())
    }
}

impl Default for DomainName {
    fn default() -> Self {
        Self {
            len: 1,
            data: [0u8; MAX_DOMAIN_LEN],
            absolute: true,
        }
    }
}

/// Iterator over the labels of a [`DomainName`].
pub struct Labels<'a> {
    wire: &'a [u8],
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let (&len, rest) = self.wire.split_first()?;
        if len == 0 {
            self.wire = &[];
            return None;
        }
        let (label, rest) = rest.split_at(len as usize);
        self.wire = rest;
        Some(label)
    }
}

/// DNS Time To Live value, limited to 2^31 - 1 seconds (RFC 2181 §8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Ttl(u32);

impl Ttl {
    pub const ZERO: Ttl = Ttl(0);
    pub const ONE_MINUTE: Ttl = Ttl(60);
    pub const FIVE_MINUTES: Ttl = Ttl(300);
    pub const ONE_HOUR: Ttl = Ttl(3600);
    pub const ONE_DAY: Ttl = Ttl(86400);
    pub const MAX: Ttl = Ttl(MAX_TTL);

    /// Creates a TTL, clamping to the RFC maximum.
    #[inline]
    pub const fn new(seconds: u32) -> Self {
        if seconds > MAX_TTL {
            Self(MAX_TTL)
        } else {
            Self(seconds)
        }
    }

    /// Creates a TTL from a 64-bit second count, clamping to the RFC maximum.
    #[inline]
    pub const fn saturating_from_u64(seconds: u64) -> Self {
        if seconds > MAX_TTL as u64 {
            Self(MAX_TTL)
        } else {
            Self(seconds as u32)
        }
    }

    /// Returns `None` if `seconds` exceeds the RFC maximum.
    #[inline]
    pub const fn try_new(seconds: u32) -> Option<Self> {
        if seconds > MAX_TTL {
            None
        } else {
            Some(Self(seconds))
        }
    }

    #[inline]
    pub const fn as_secs(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Ttl {
    #[inline]
    fn from(secs: u32) -> Self {
        Self::new(secs)
    }
}

impl From<Ttl> for u32 {
    #[inline]
    fn from(ttl: Ttl) -> Self {
        ttl.0
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// DNS record type codes (RFC 1035 §3.2.2 and later registrations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RecordType {
    A = 1,
    NS = 2,
    CNAME = 5,
    SOA = 6,
    PTR = 12,
    MX = 15,
    TXT = 16,
    AAAA = 28,
    SRV = 33,
    NAPTR = 35,
    DS = 43,
    SSHFP = 44,
    DNSKEY = 48,
    TLSA = 52,
    CAA = 257,
}

impl RecordType {
    const ALL: [RecordType; 15] = [
        Self::A,
        Self::NS,
        Self::CNAME,
        Self::SOA,
        Self::PTR,
        Self::MX,
        Self::TXT,
        Self::AAAA,
        Self::SRV,
        Self::NAPTR,
        Self::DS,
        Self::SSHFP,
        Self::DNSKEY,
        Self::TLSA,
        Self::CAA,
    ];

    pub fn from_u16(value: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_u16() == value)
    }

    /// Parses a mnemonic, ignoring ASCII case.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    #[inline]
    pub const fn as_u16(&self) -> u16 {
        *self as u16
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::NS => "NS",
            Self::CNAME => "CNAME",
            Self::SOA => "SOA",
            Self::PTR => "PTR",
            Self::MX => "MX",
            Self::TXT => "TXT",
            Self::AAAA => "AAAA",
            Self::SRV => "SRV",
            Self::NAPTR => "NAPTR",
            Self::DS => "DS",
            Self::SSHFP => "SSHFP",
            Self::DNSKEY => "DNSKEY",
            Self::TLSA => "TLSA",
            Self::CAA => "CAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
