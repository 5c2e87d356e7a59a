//! Protocol and game-mod identification
//!
//! Eight wire-format variants are supported, identified by the recording's
//! file extension (`.dm_3` through `.dm_91`). The protocol selects the
//! wire field tables; the game mod refines the magic-number translation
//! on top of it.

use std::path::Path;

use crate::error::Error;

/// Demo wire-format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    Dm3,
    Dm48,
    Dm66,
    Dm67,
    Dm68,
    Dm73,
    Dm90,
    Dm91,
}

impl Protocol {
    /// All supported protocols, oldest first
    pub const ALL: [Protocol; 8] = [
        Protocol::Dm3,
        Protocol::Dm48,
        Protocol::Dm66,
        Protocol::Dm67,
        Protocol::Dm68,
        Protocol::Dm73,
        Protocol::Dm90,
        Protocol::Dm91,
    ];

    /// Infer the protocol from a recording's file extension.
    ///
    /// Extensions newer than `.dm_91` report [`Error::MaxProtocolExceeded`];
    /// anything else unrecognized reports [`Error::InvalidDemoFile`].
    pub fn from_path(path: &Path) -> Result<Protocol, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::InvalidDemoFile(format!("{}: no file extension", path.display())))?;
        Self::from_extension(ext)
            .ok_or_else(|| match ext.strip_prefix("dm_").and_then(|v| v.parse::<u32>().ok()) {
                Some(version) if version > 91 => Error::MaxProtocolExceeded(format!("dm_{version}")),
                _ => Error::InvalidDemoFile(format!("unknown demo extension .{ext}")),
            })
    }

    /// Map a file extension (without the dot) to a protocol.
    pub fn from_extension(ext: &str) -> Option<Protocol> {
        match ext {
            "dm_3" => Some(Protocol::Dm3),
            "dm_48" => Some(Protocol::Dm48),
            "dm_66" => Some(Protocol::Dm66),
            "dm_67" => Some(Protocol::Dm67),
            "dm_68" => Some(Protocol::Dm68),
            "dm_73" => Some(Protocol::Dm73),
            "dm_90" => Some(Protocol::Dm90),
            "dm_91" => Some(Protocol::Dm91),
            _ => None,
        }
    }

    /// The file extension (without the dot) for this protocol
    pub fn extension(self) -> &'static str {
        match self {
            Protocol::Dm3 => "dm_3",
            Protocol::Dm48 => "dm_48",
            Protocol::Dm66 => "dm_66",
            Protocol::Dm67 => "dm_67",
            Protocol::Dm68 => "dm_68",
            Protocol::Dm73 => "dm_73",
            Protocol::Dm90 => "dm_90",
            Protocol::Dm91 => "dm_91",
        }
    }

    /// True for the Quake Live family (dm73 and later), whose field tables
    /// and magic numbers diverge from the Quake 3 family.
    pub fn is_quake_live(self) -> bool {
        self >= Protocol::Dm73
    }
}

/// Game-mod dialect refining the wire-level numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMod {
    /// Plain baseline game (baseq3 and close derivatives)
    #[default]
    Baseline,
    /// Challenge ProMode Arena
    Cpma,
    /// Orange Smoothie Productions
    Osp,
    /// Quake Live
    Quakelive,
}

impl GameMod {
    /// Identify the mod from the protocol and the server-info `gamename`.
    ///
    /// Quake Live is a protocol family, not a `gamename`; the others are
    /// announced by the server info string.
    pub fn identify(protocol: Protocol, game_name: Option<&str>) -> GameMod {
        if protocol.is_quake_live() {
            return GameMod::Quakelive;
        }
        match game_name {
            Some(name) if name.eq_ignore_ascii_case("cpma") => GameMod::Cpma,
            Some(name) if name.eq_ignore_ascii_case("osp") => GameMod::Osp,
            _ => GameMod::Baseline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Protocol::from_extension("dm_68"), Some(Protocol::Dm68));
        assert_eq!(Protocol::from_extension("dm_91"), Some(Protocol::Dm91));
        assert_eq!(Protocol::from_extension("dm_92"), None);
        assert_eq!(Protocol::from_extension("zip"), None);
    }

    #[test]
    fn test_from_path_errors() {
        let too_new = Protocol::from_path(Path::new("x/demo.dm_95"));
        assert!(matches!(too_new, Err(Error::MaxProtocolExceeded(_))));

        let unknown = Protocol::from_path(Path::new("x/demo.txt"));
        assert!(matches!(unknown, Err(Error::InvalidDemoFile(_))));

        let ok = Protocol::from_path(Path::new("x/demo.dm_73")).unwrap();
        assert_eq!(ok, Protocol::Dm73);
    }

    #[test]
    fn test_family_split() {
        assert!(!Protocol::Dm68.is_quake_live());
        assert!(Protocol::Dm73.is_quake_live());
        assert!(Protocol::Dm91.is_quake_live());
    }

    #[test]
    fn test_mod_identification() {
        assert_eq!(
            GameMod::identify(Protocol::Dm68, Some("CPMA")),
            GameMod::Cpma
        );
        assert_eq!(GameMod::identify(Protocol::Dm68, Some("osp")), GameMod::Osp);
        assert_eq!(
            GameMod::identify(Protocol::Dm68, Some("baseq3")),
            GameMod::Baseline
        );
        assert_eq!(GameMod::identify(Protocol::Dm68, None), GameMod::Baseline);
        // Protocol wins over gamename for QL
        assert_eq!(
            GameMod::identify(Protocol::Dm90, Some("baseq3")),
            GameMod::Quakelive
        );
    }
}
