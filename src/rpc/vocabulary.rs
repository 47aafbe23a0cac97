//! Closed NETCONF vocabularies backed by wire strings.
//!
//! Every enum here maps one-to-one onto a canonical wire string: a namespace
//! URI for [`Capability`], an element name for [`Operation`] and a value
//! string for the `rpc-error` enums. Reverse lookup goes through a static
//! table built on first use.
//!
//! Two lookup flavours exist:
//! - `from_wire` is strict and fails with [`NetconfError::UnknownValue`];
//! - `lookup` is lenient and returns the `Unrecognized` sentinel, keeping the
//!   original string so that re-serialization is lossless. The parser only
//!   ever uses this one.
//!
//! # Example
//!
//! ```
//! use netconf_emu::rpc::{ErrorTag, Operation};
//!
//! assert_eq!(Operation::lookup("get-config"), Operation::GetConfig);
//! assert_eq!(Operation::GetConfig.as_str(), "get-config");
//! assert!(ErrorTag::from_wire("no-such-tag").is_err());
//! assert!(!ErrorTag::lookup("no-such-tag").is_recognized());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{NetconfError, Result};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A wire string outside the known vocabulary, kept verbatim.
            Unrecognized(String),
        }

        impl $name {
            /// Every known variant paired with its wire string.
            pub const KNOWN: &'static [($name, &'static str)] = &[ $( ($name::$variant, $wire), )+ ];

            /// Canonical wire string.
            pub fn as_str(&self) -> &str {
                match self {
                    $( $name::$variant => $wire, )+
                    $name::Unrecognized(value) => value.as_str(),
                }
            }

            /// Strict reverse lookup.
            pub fn from_wire(value: &str) -> Result<Self> {
                Self::table()
                    .get(value.trim())
                    .cloned()
                    .ok_or_else(|| NetconfError::UnknownValue {
                        kind: $kind,
                        value: value.to_string(),
                    })
            }

            /// Lenient reverse lookup, falling back to `Unrecognized`.
            pub fn lookup(value: &str) -> Self {
                let value = value.trim();
                match Self::table().get(value) {
                    Some(known) => known.clone(),
                    None => $name::Unrecognized(value.to_string()),
                }
            }

            /// False for the `Unrecognized` sentinel.
            pub fn is_recognized(&self) -> bool {
                !matches!(self, $name::Unrecognized(_))
            }

            fn table() -> &'static HashMap<&'static str, $name> {
                static TABLE: OnceLock<HashMap<&'static str, $name>> = OnceLock::new();
                TABLE.get_or_init(|| {
                    Self::KNOWN
                        .iter()
                        .map(|(variant, wire)| (*wire, variant.clone()))
                        .collect()
                })
            }
        }

        impl FromStr for $name {
            type Err = NetconfError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_wire(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                Ok(Self::lookup(&value))
            }
        }
    };
}

wire_enum! {
    /// Capability advertised in a `<hello>`.
    pub enum Capability ("capability") {
        /// NETCONF base protocol 1.0.
        Base => "urn:ietf:params:netconf:base:1.0",
        WritableRunning => "urn:ietf:params:netconf:capability:writable-running:1.0",
        Candidate => "urn:ietf:params:netconf:capability:candidate:1.0",
        ConfirmedCommit => "urn:ietf:params:netconf:capability:confirmed-commit:1.0",
        RollbackOnError => "urn:ietf:params:netconf:capability:rollback-on-error:1.0",
        Validate => "urn:ietf:params:netconf:capability:validate:1.0",
        DistinctStartup => "urn:ietf:params:netconf:capability:startup:1.0",
        Url => "urn:ietf:params:netconf:capability:url:1.0",
        XPath => "urn:ietf:params:netconf:capability:xpath:1.0",
        /// Junos extension namespace.
        Junos => "http://xml.juniper.net/netconf/junos/1.0",
        /// Junos DMI system namespace.
        JunosDmi => "http://xml.juniper.net/dmi/system/1.0",
    }
}

wire_enum! {
    /// Operation requested by an `<rpc>`, keyed by element name.
    pub enum Operation ("operation") {
        GetConfig => "get-config",
        EditConfig => "edit-config",
        CopyConfig => "copy-config",
        DeleteConfig => "delete-config",
        Lock => "lock",
        Unlock => "unlock",
        Get => "get",
        CloseSession => "close-session",
        KillSession => "kill-session",
        Commit => "commit",
        DiscardChanges => "discard-changes",
        Validate => "validate",
        // Junos extensions
        SetLogicalRouter => "set-logical-router",
        GetRouteInfo => "get-route-information",
        GetInterfaceInfo => "get-interface-information",
        GetSoftwareInfo => "get-software-information",
        GetRollbackInfo => "get-rollback-information",
        OpenConfig => "open-configuration",
        CloseConfig => "close-configuration",
        LoadConfiguration => "load-configuration",
    }
}

wire_enum! {
    /// Conceptual layer an `rpc-error` originated from.
    pub enum ErrorType ("error-type") {
        Transport => "transport",
        Rpc => "rpc",
        Protocol => "protocol",
        Application => "application",
    }
}

wire_enum! {
    /// `error-tag` values from RFC 6241 Appendix A.
    pub enum ErrorTag ("error-tag") {
        InUse => "in-use",
        InvalidValue => "invalid-value",
        TooBig => "too-big",
        MissingAttribute => "missing-attribute",
        BadAttribute => "bad-attribute",
        UnknownAttribute => "unknown-attribute",
        MissingElement => "missing-element",
        BadElement => "bad-element",
        UnknownElement => "unknown-element",
        UnknownNamespace => "unknown-namespace",
        AccessDenied => "access-denied",
        LockDenied => "lock-denied",
        ResourceDenied => "resource-denied",
        RollbackFailed => "rollback-failed",
        DataExists => "data-exists",
        DataMissing => "data-missing",
        OperationNotSupported => "operation-not-supported",
        OperationFailed => "operation-failed",
        PartialOperation => "partial-operation",
        MalformedMessage => "malformed-message",
    }
}

wire_enum! {
    /// `error-severity` values.
    pub enum ErrorSeverity ("error-severity") {
        Error => "error",
        Warning => "warning",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_value_resolves_to_itself() {
        for (variant, wire) in Capability::KNOWN {
            assert_eq!(&Capability::from_wire(wire).unwrap(), variant);
            assert_eq!(variant.as_str(), *wire);
        }
        for (variant, wire) in Operation::KNOWN {
            assert_eq!(&Operation::from_wire(wire).unwrap(), variant);
        }
        for (variant, wire) in ErrorTag::KNOWN {
            assert_eq!(&ErrorTag::from_wire(wire).unwrap(), variant);
        }
    }

    #[test]
    fn test_strict_lookup_reports_unknown_value() {
        let err = ErrorType::from_wire("cosmic-ray").unwrap_err();
        match err {
            NetconfError::UnknownValue { kind, value } => {
                assert_eq!(kind, "error-type");
                assert_eq!(value, "cosmic-ray");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lenient_lookup_keeps_original_string() {
        let cap = Capability::lookup(" urn:example:capability:frobnicate:1.0 ");
        assert_eq!(
            cap,
            Capability::Unrecognized("urn:example:capability:frobnicate:1.0".to_string())
        );
        assert_eq!(cap.as_str(), "urn:example:capability:frobnicate:1.0");
        assert!(!cap.is_recognized());
    }

    #[test]
    fn test_lookup_trims_whitespace() {
        assert_eq!(ErrorSeverity::lookup("\n  error\n"), ErrorSeverity::Error);
        assert_eq!("warning".parse::<ErrorSeverity>().unwrap(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&Operation::GetRouteInfo).unwrap();
        assert_eq!(json, "\"get-route-information\"");

        let op: Operation = serde_json::from_str("\"get-bogus-op\"").unwrap();
        assert_eq!(op, Operation::Unrecognized("get-bogus-op".to_string()));
    }
}
