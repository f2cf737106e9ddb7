//! Install/user path resolution and the path-alias table.

use std::path::{Path, PathBuf};

use aurora_core::ini::Ini;

/// Aliases appearing in `nwnplayer.ini` and in `ALIAS:file` references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathAlias {
    Ambient,
    Development,
    DmVault,
    Hak,
    LocalVault,
    Modules,
    Movies,
    Music,
    NWSync,
    Override,
    Portraits,
    ServerVault,
    Temp,
    Tlk,
}

impl PathAlias {
    const ALL: &'static [PathAlias] = &[
        PathAlias::Ambient,
        PathAlias::Development,
        PathAlias::DmVault,
        PathAlias::Hak,
        PathAlias::LocalVault,
        PathAlias::Modules,
        PathAlias::Movies,
        PathAlias::Music,
        PathAlias::NWSync,
        PathAlias::Override,
        PathAlias::Portraits,
        PathAlias::ServerVault,
        PathAlias::Temp,
        PathAlias::Tlk,
    ];

    /// Key under the ini `[Alias]` section, also the `ALIAS:` prefix.
    pub fn key(self) -> &'static str {
        match self {
            PathAlias::Ambient => "AMBIENT",
            PathAlias::Development => "DEVELOPMENT",
            PathAlias::DmVault => "DMVAULT",
            PathAlias::Hak => "HAK",
            PathAlias::LocalVault => "LOCALVAULT",
            PathAlias::Modules => "MODULES",
            PathAlias::Movies => "MOVIES",
            PathAlias::Music => "MUSIC",
            PathAlias::NWSync => "NWSYNC",
            PathAlias::Override => "OVERRIDE",
            PathAlias::Portraits => "PORTRAITS",
            PathAlias::ServerVault => "SERVERVAULT",
            PathAlias::Temp => "TEMP",
            PathAlias::Tlk => "TLK",
        }
    }

    /// Directory under the user path when the ini has no override.
    fn default_dir(self) -> &'static str {
        match self {
            PathAlias::Ambient => "ambient",
            PathAlias::Development => "development",
            PathAlias::DmVault => "dmvault",
            PathAlias::Hak => "hak",
            PathAlias::LocalVault => "localvault",
            PathAlias::Modules => "modules",
            PathAlias::Movies => "movies",
            PathAlias::Music => "music",
            PathAlias::NWSync => "nwsync",
            PathAlias::Override => "override",
            PathAlias::Portraits => "portraits",
            PathAlias::ServerVault => "servervault",
            PathAlias::Temp => "temp",
            PathAlias::Tlk => "tlk",
        }
    }

    pub fn from_key(key: &str) -> Option<PathAlias> {
        PathAlias::ALL
            .iter()
            .copied()
            .find(|a| a.key().eq_ignore_ascii_case(key))
    }
}

/// Process-wide configuration: install and user roots plus `nwnplayer.ini`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    install: PathBuf,
    user: PathBuf,
    nwn_ini: Ini,
}

impl Config {
    pub fn new(install: impl Into<PathBuf>, user: impl Into<PathBuf>) -> Config {
        let install = install.into();
        let user = user.into();
        let ini_path = user.join("nwnplayer.ini");
        let nwn_ini = if ini_path.is_file() {
            Ini::from_file(&ini_path)
        } else {
            log::info!("config: no nwnplayer.ini under {}", user.display());
            Ini::default()
        };
        Config {
            install,
            user,
            nwn_ini,
        }
    }

    /// Install root from `NWN_ROOT`, user root alongside it. Used under CI.
    pub fn from_env() -> Config {
        let install = std::env::var_os("NWN_ROOT")
            .map(PathBuf::from)
            .unwrap_or_default();
        let user = install.clone();
        Config::new(install, user)
    }

    pub fn install_path(&self) -> &Path {
        &self.install
    }

    pub fn user_path(&self) -> &Path {
        &self.user
    }

    pub fn nwn_ini(&self) -> &Ini {
        &self.nwn_ini
    }

    /// Directory for an alias: the ini `[Alias]` override when present,
    /// otherwise the fixed directory under the user root.
    pub fn alias_path(&self, alias: PathAlias) -> PathBuf {
        match self.nwn_ini.get_str(&format!("Alias/{}", alias.key())) {
            Some(p) => PathBuf::from(p),
            None => self.user.join(alias.default_dir()),
        }
    }

    /// Resolves `"HAK:test.hak"`-style references. Strings without an alias
    /// prefix resolve as plain paths.
    pub fn resolve_alias(&self, reference: &str) -> PathBuf {
        if let Some((prefix, rest)) = reference.split_once(':') {
            if let Some(alias) = PathAlias::from_key(prefix) {
                return self.alias_path(alias).join(rest);
            }
        }
        PathBuf::from(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("{prefix}_{pid}_{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn alias_defaults_and_overrides() {
        let user = unique_temp_dir("config");
        fs::write(
            user.join("nwnplayer.ini"),
            "[Alias]\nTEMP=/custom/temp\n",
        )
        .unwrap();

        let config = Config::new(user.join("install"), &user);
        assert!(config.nwn_ini().valid());
        assert_eq!(
            config.nwn_ini().get_str("Alias/TEMP"),
            Some("/custom/temp")
        );

        assert_eq!(config.alias_path(PathAlias::Temp), PathBuf::from("/custom/temp"));
        assert_eq!(config.alias_path(PathAlias::Hak), user.join("hak"));
        assert!(!config
            .alias_path(PathAlias::Development)
            .as_os_str()
            .is_empty());
    }

    #[test]
    fn resolve_alias_references() {
        let user = unique_temp_dir("config_alias");
        let config = Config::new(user.join("install"), &user);

        assert_eq!(
            config.resolve_alias("HAK:test.hak"),
            config.alias_path(PathAlias::Hak).join("test.hak")
        );
        assert_eq!(
            config.resolve_alias("plain/path.mod"),
            PathBuf::from("plain/path.mod")
        );
    }
}
