//! Resolution of the on-disk database location

use std::path::{Path, PathBuf};

use sqlx::sqlite::SqliteConnectOptions;

use crate::config::LifecycleConfig;
use crate::error::Error;
use crate::platform::{HostEnvironment, Platform};
use crate::Result;

/// Query modifier appended to the file name when shared cache is enabled
pub const SHARED_CACHE_MODIFIER: &str = "?cache=shared";

/// Database location derived from a [`LifecycleConfig`] and a [`HostEnvironment`]
///
/// Resolution is pure: nothing is created or opened here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
   directory: PathBuf,
   file_name: String,
   shared_cache: bool,
}

impl ResolvedPath {
   /// Resolve the database location for a file-backed configuration.
   ///
   /// The per-platform override directory wins when set. Otherwise:
   ///
   /// | Platform | Directory                                            |
   /// |----------|------------------------------------------------------|
   /// | Windows  | `%APPDATA%\{name}`                                   |
   /// | macOS    | `$HOME/Library/Application Support/{name}/{name}.db` |
   /// | Linux    | `$HOME/.config/{name}`                               |
   ///
   /// The file inside that directory is always `{name}.db`.
   pub fn resolve(config: &LifecycleConfig, env: &HostEnvironment) -> Result<Self> {
      let name = config.name.as_str();
      if name.is_empty() {
         return Err(Error::Configuration(
            "a database name is required unless the database is in memory".to_string(),
         ));
      }

      let directory = match env.platform() {
         Platform::Windows => match non_empty(&config.windows_dir) {
            Some(dir) => PathBuf::from(dir),
            None => home_var(env, "APPDATA", "windowsDir")?.join(name),
         },
         Platform::MacOs => match non_empty(&config.mac_dir) {
            Some(dir) => PathBuf::from(dir),
            None => home_var(env, "HOME", "macDir")?
               .join("Library")
               .join("Application Support")
               .join(name)
               .join(format!("{}.db", name)),
         },
         Platform::Linux => match non_empty(&config.linux_dir) {
            Some(dir) => PathBuf::from(dir),
            None => home_var(env, "HOME", "linuxDir")?.join(".config").join(name),
         },
         Platform::Other(os) => return Err(Error::UnsupportedPlatform(os.clone())),
      };

      Ok(Self {
         directory,
         file_name: format!("{}.db", name),
         shared_cache: config.shared_cache,
      })
   }

   /// Directory that holds the database file
   pub fn directory(&self) -> &Path {
      &self.directory
   }

   /// Bare database file name, `{name}.db`
   pub fn file_name(&self) -> &str {
      &self.file_name
   }

   /// Full path of the database file, without any query modifier
   pub fn file_path(&self) -> PathBuf {
      self.directory.join(&self.file_name)
   }

   /// Display form of the opened target: the full path plus the
   /// shared-cache modifier when enabled. Reported in events and status,
   /// never parsed back into a path.
   pub fn connection_string(&self) -> String {
      let mut target = self.file_path().to_string_lossy().into_owned();
      if self.shared_cache {
         target.push_str(SHARED_CACHE_MODIFIER);
      }
      target
   }

   /// Connect options for [`file_path`](Self::file_path), taken verbatim
   /// rather than parsed as a URL. The file is created when missing.
   pub fn connect_options(&self) -> SqliteConnectOptions {
      SqliteConnectOptions::new()
         .filename(self.file_path())
         .shared_cache(self.shared_cache)
         .create_if_missing(true)
   }
}

fn non_empty(dir: &Option<String>) -> Option<&str> {
   dir.as_deref().filter(|d| !d.is_empty())
}

fn home_var(env: &HostEnvironment, var: &str, override_field: &str) -> Result<PathBuf> {
   env.var(var).map(PathBuf::from).ok_or_else(|| {
      Error::Configuration(format!(
         "environment variable {} is not set; configure {} to choose the database directory",
         var, override_field
      ))
   })
}

#[cfg(test)]
mod tests {
   use super::*;

   fn env(platform: Platform) -> HostEnvironment {
      HostEnvironment::fixed(
         platform,
         [
            ("HOME", "/home/ada"),
            ("APPDATA", "C:\\Users\\ada\\AppData\\Roaming"),
         ],
      )
   }

   #[test]
   fn test_linux_default() {
      let path = ResolvedPath::resolve(&LifecycleConfig::named("app"), &env(Platform::Linux)).unwrap();
      assert_eq!(path.directory(), Path::new("/home/ada/.config/app"));
      assert_eq!(path.file_name(), "app.db");
      assert_eq!(path.file_path(), PathBuf::from("/home/ada/.config/app/app.db"));
   }

   #[test]
   fn test_macos_default() {
      let path = ResolvedPath::resolve(&LifecycleConfig::named("app"), &env(Platform::MacOs)).unwrap();
      assert_eq!(
         path.directory(),
         Path::new("/home/ada/Library/Application Support/app/app.db")
      );
      assert_eq!(path.file_name(), "app.db");
   }

   #[test]
   fn test_windows_default() {
      let path =
         ResolvedPath::resolve(&LifecycleConfig::named("app"), &env(Platform::Windows)).unwrap();
      assert_eq!(
         path.directory(),
         PathBuf::from("C:\\Users\\ada\\AppData\\Roaming").join("app")
      );
   }

   #[test]
   fn test_override_wins_for_current_platform_only() {
      let config = LifecycleConfig {
         mac_dir: Some("/mac/db".into()),
         windows_dir: Some("D:\\db".into()),
         linux_dir: Some("/srv/db".into()),
         ..LifecycleConfig::named("app")
      };

      let linux = ResolvedPath::resolve(&config, &env(Platform::Linux)).unwrap();
      let mac = ResolvedPath::resolve(&config, &env(Platform::MacOs)).unwrap();
      let windows = ResolvedPath::resolve(&config, &env(Platform::Windows)).unwrap();

      assert_eq!(linux.directory(), Path::new("/srv/db"));
      assert_eq!(mac.directory(), Path::new("/mac/db"));
      assert_eq!(windows.directory(), Path::new("D:\\db"));
   }

   #[test]
   fn test_empty_override_falls_back_to_default() {
      let config = LifecycleConfig {
         linux_dir: Some(String::new()),
         ..LifecycleConfig::named("app")
      };
      let path = ResolvedPath::resolve(&config, &env(Platform::Linux)).unwrap();
      assert_eq!(path.directory(), Path::new("/home/ada/.config/app"));
   }

   #[test]
   fn test_missing_name_is_configuration_error() {
      let err = ResolvedPath::resolve(&LifecycleConfig::default(), &env(Platform::Linux)).unwrap_err();
      assert!(matches!(err, Error::Configuration(_)));
   }

   #[test]
   fn test_unsupported_platform() {
      let err = ResolvedPath::resolve(
         &LifecycleConfig::named("app"),
         &env(Platform::Other("plan9".into())),
      )
      .unwrap_err();
      assert!(matches!(err, Error::UnsupportedPlatform(ref os) if os == "plan9"));
   }

   #[test]
   fn test_missing_home_is_configuration_error() {
      let env = HostEnvironment::fixed(Platform::Linux, Vec::<(String, String)>::new());
      let err = ResolvedPath::resolve(&LifecycleConfig::named("app"), &env).unwrap_err();
      assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("HOME")));
   }

   #[test]
   fn test_shared_cache_modifier_appended_once() {
      let config = LifecycleConfig {
         shared_cache: true,
         ..LifecycleConfig::named("app")
      };
      let path = ResolvedPath::resolve(&config, &env(Platform::Linux)).unwrap();
      let target = path.connection_string();

      assert_eq!(target, "/home/ada/.config/app/app.db?cache=shared");
      assert_eq!(target.matches(SHARED_CACHE_MODIFIER).count(), 1);
      // The file on disk never carries the modifier
      assert_eq!(path.file_path(), PathBuf::from("/home/ada/.config/app/app.db"));
   }

   #[test]
   fn test_connection_string_without_shared_cache() {
      let path = ResolvedPath::resolve(&LifecycleConfig::named("app"), &env(Platform::Linux)).unwrap();
      assert_eq!(path.connection_string(), "/home/ada/.config/app/app.db");
   }

   #[test]
   fn test_connect_options_enable_shared_cache() {
      let config = LifecycleConfig {
         shared_cache: true,
         ..LifecycleConfig::named("app")
      };
      let path = ResolvedPath::resolve(&config, &env(Platform::Linux)).unwrap();
      let options = path.connect_options();
      assert_eq!(options.get_filename(), Path::new("/home/ada/.config/app/app.db"));
      assert!(format!("{:?}", options).contains("shared_cache: true"));

      let private = ResolvedPath::resolve(&LifecycleConfig::named("app"), &env(Platform::Linux))
         .unwrap()
         .connect_options();
      assert!(format!("{:?}", private).contains("shared_cache: false"));
   }

   #[test]
   fn test_connect_options_keep_url_characters_in_path() {
      let config = LifecycleConfig {
         linux_dir: Some("/srv/data%41/what?x".into()),
         shared_cache: true,
         ..LifecycleConfig::named("app")
      };
      let path = ResolvedPath::resolve(&config, &env(Platform::Linux)).unwrap();
      let options = path.connect_options();
      assert_eq!(options.get_filename(), Path::new("/srv/data%41/what?x/app.db"));
      assert_eq!(options.get_filename(), path.file_path());
   }
}
