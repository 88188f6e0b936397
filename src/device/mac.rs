//! Bluetooth MAC addresses and the node names derived from them.
//!
//! A sensor node can be named after its MAC address: the six address bytes
//! encoded as Base64 give a unique name of exactly eight characters, the
//! maximum length of a node name.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Bluetooth MAC address of a sensor node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Create an address from its bytes (most significant first)
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Address bytes (most significant first)
    pub fn bytes(&self) -> [u8; 6] {
        self.0
    }

    /// Base64 encoded address bytes, usable as node name
    ///
    /// # Example
    ///
    /// ```
    /// use icotest::device::MacAddress;
    ///
    /// let mac: MacAddress = "08:6b:d7:01:de:81".parse().unwrap();
    /// assert_eq!(mac.base64_name(), "CGvXAd6B");
    /// ```
    pub fn base64_name(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = String;

    /// Parse `08:6b:d7:01:de:81`, `08-6B-D7-01-DE-81` or `086bd701de81`
    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = text.trim();
        let digits: String = if trimmed.contains([':', '-']) {
            let groups: Vec<&str> = trimmed.split([':', '-']).collect();
            if groups.len() != 6 || groups.iter().any(|group| group.len() != 2) {
                return Err(format!(
                    "Invalid MAC address “{text}”: expected six groups of two hex digits"
                ));
            }
            groups.concat()
        } else {
            trimmed.to_string()
        };

        if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!(
                "Invalid MAC address “{text}”: expected 12 hex digits"
            ));
        }

        let mut bytes = [0; 6];
        for (index, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[2 * index..2 * index + 2], 16)
                .map_err(|err| format!("Invalid MAC address “{text}”: {err}"))?;
        }
        Ok(Self(bytes))
    }
}
