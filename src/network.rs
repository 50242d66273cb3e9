//! Network prefix parsing and canonical 128-bit embedding.

use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::PrefixError;

/// Bits that precede an embedded IPv4 address.
pub const IPV4_EMBED_BITS: u8 = 96;

/// Address family of a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

/// A validated network prefix in the 128-bit address space.
///
/// IPv4 prefixes are embedded at `::a.b.c.d/(96 + len)`. Bits beyond the
/// prefix length are always zero.
///
/// # Examples
/// ```
/// use k2geo::NetworkPrefix;
///
/// let p: NetworkPrefix = "203.0.113.0/24".parse().unwrap();
/// assert_eq!(p.len(), 120);
/// assert!("203.0.113.1/24".parse::<NetworkPrefix>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkPrefix {
    family: Family,
    bits: u128,
    len: u8,
}

impl NetworkPrefix {
    /// Build from an `IpNet`, rejecting host bits.
    pub fn from_net(net: IpNet) -> Result<Self, PrefixError> {
        if net.addr() != net.network() {
            return Err(PrefixError::HostBitsSet(net.to_string()));
        }
        Ok(match net {
            IpNet::V4(v4) => Self {
                family: Family::V4,
                bits: u32::from(v4.network()) as u128,
                len: IPV4_EMBED_BITS + v4.prefix_len(),
            },
            IpNet::V6(v6) => Self {
                family: Family::V6,
                bits: u128::from(v6.network()),
                len: v6.prefix_len(),
            },
        })
    }

    /// Build directly from 128-bit components.
    pub fn new(family: Family, bits: u128, len: u8) -> Result<Self, PrefixError> {
        let prefix = Self { family, bits, len };
        let in_range = len <= 128 && (family == Family::V6 || len >= IPV4_EMBED_BITS);
        if !in_range || (family == Family::V4 && bits >> 32 != 0) {
            return Err(PrefixError::InvalidCidr(format!("{:x}/{}", bits, len)));
        }
        if bits & !mask(len) != 0 {
            return Err(PrefixError::HostBitsSet(prefix.to_string()));
        }
        Ok(prefix)
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Base address in the 128-bit space.
    pub fn bits(&self) -> u128 {
        self.bits
    }

    /// Prefix length in the 128-bit space.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u8 {
        self.len
    }

    /// Whether `addr` falls inside this prefix.
    pub fn contains(&self, addr: IpAddr) -> bool {
        address_key(addr) & mask(self.len) == self.bits
    }

    /// Whether `other` is equal to or more specific than this prefix.
    pub fn covers(&self, other: &NetworkPrefix) -> bool {
        other.len >= self.len && other.bits & mask(self.len) == self.bits
    }
}

impl FromStr for NetworkPrefix {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let net = s
            .parse::<IpNet>()
            .map_err(|_| PrefixError::InvalidCidr(s.to_string()))?;
        Self::from_net(net)
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            Family::V4 => write!(
                f,
                "{}/{}",
                std::net::Ipv4Addr::from(self.bits as u32),
                self.len - IPV4_EMBED_BITS
            ),
            Family::V6 => write!(f, "{}/{}", std::net::Ipv6Addr::from(self.bits), self.len),
        }
    }
}

/// Embed an address in the 128-bit space. IPv4 maps to `::a.b.c.d`.
pub fn address_key(addr: IpAddr) -> u128 {
    match addr {
        IpAddr::V4(v4) => u32::from(v4) as u128,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

/// Network mask with the top `len` bits set.
pub fn mask(len: u8) -> u128 {
    match len {
        0 => 0,
        n if n >= 128 => u128::MAX,
        n => !(u128::MAX >> n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ipv4_prefix() {
        let p: NetworkPrefix = "10.0.0.0/8".parse().unwrap();
        assert_eq!(p.family(), Family::V4);
        assert_eq!(p.bits(), 0x0A00_0000);
        assert_eq!(p.len(), 104);
        assert_eq!(p.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_parse_ipv6_prefix() {
        let p: NetworkPrefix = "2001:db8::/32".parse().unwrap();
        assert_eq!(p.family(), Family::V6);
        assert_eq!(p.bits(), 0x2001_0db8u128 << 96);
        assert_eq!(p.len(), 32);
        assert_eq!(p.to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_reject_malformed() {
        assert!(matches!(
            "invalid".parse::<NetworkPrefix>(),
            Err(PrefixError::InvalidCidr(_))
        ));
        assert!("192.168.1.1".parse::<NetworkPrefix>().is_err());
        assert!("192.168.1.0/33".parse::<NetworkPrefix>().is_err());
        assert!("2001:db8::/129".parse::<NetworkPrefix>().is_err());
        assert!("".parse::<NetworkPrefix>().is_err());
    }

    #[test]
    fn test_reject_host_bits() {
        assert!(matches!(
            "10.0.0.1/8".parse::<NetworkPrefix>(),
            Err(PrefixError::HostBitsSet(_))
        ));
        assert!(matches!(
            "2001:db8::1/32".parse::<NetworkPrefix>(),
            Err(PrefixError::HostBitsSet(_))
        ));
        assert!("10.0.0.1/32".parse::<NetworkPrefix>().is_ok());
    }

    #[test]
    fn test_new_validates() {
        assert!(NetworkPrefix::new(Family::V6, 0, 0).is_ok());
        assert!(NetworkPrefix::new(Family::V6, 1, 64).is_err());
        assert!(NetworkPrefix::new(Family::V6, 0, 129).is_err());
        assert!(NetworkPrefix::new(Family::V4, 0, 95).is_err());
        assert!(NetworkPrefix::new(Family::V4, 1 << 40, 128).is_err());
    }

    #[test]
    fn test_contains() {
        let p: NetworkPrefix = "203.0.113.128/25".parse().unwrap();
        assert!(p.contains("203.0.113.200".parse().unwrap()));
        assert!(!p.contains("203.0.113.127".parse().unwrap()));

        let zero: NetworkPrefix = "::/0".parse().unwrap();
        assert!(zero.contains("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_covers() {
        let wide: NetworkPrefix = "203.0.113.0/24".parse().unwrap();
        let narrow: NetworkPrefix = "203.0.113.128/25".parse().unwrap();
        assert!(wide.covers(&narrow));
        assert!(wide.covers(&wide));
        assert!(!narrow.covers(&wide));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask(0), 0);
        assert_eq!(mask(128), u128::MAX);
        assert_eq!(mask(1), 1u128 << 127);
    }
}
