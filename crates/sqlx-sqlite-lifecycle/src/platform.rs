//! Platform detection and environment lookup for default database directories

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;

/// Operating system family, as far as default directories are concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Platform {
   Windows,
   MacOs,
   Linux,
   /// Any other OS, carrying its `std::env::consts::OS` name
   Other(String),
}

impl Platform {
   /// The platform this process is running on.
   pub fn current() -> Self {
      Self::from_os(std::env::consts::OS)
   }

   /// Map a `std::env::consts::OS` value to a platform.
   pub fn from_os(os: &str) -> Self {
      match os {
         "windows" => Platform::Windows,
         "macos" => Platform::MacOs,
         "linux" => Platform::Linux,
         other => Platform::Other(other.to_string()),
      }
   }
}

impl fmt::Display for Platform {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Platform::Windows => f.write_str("windows"),
         Platform::MacOs => f.write_str("macos"),
         Platform::Linux => f.write_str("linux"),
         Platform::Other(os) => f.write_str(os),
      }
   }
}

/// Where default directories come from: a platform plus a source of
/// environment variables.
///
/// [`HostEnvironment::current`] reads the running OS and the process
/// environment. [`HostEnvironment::fixed`] pins both, which keeps path
/// resolution independent of the machine it runs on.
///
/// # Examples
///
/// ```
/// use sqlx_sqlite_lifecycle::{HostEnvironment, Platform};
///
/// let env = HostEnvironment::fixed(Platform::Linux, [("HOME", "/home/ada")]);
/// assert_eq!(env.platform(), &Platform::Linux);
/// assert_eq!(env.var("HOME").as_deref(), Some(std::ffi::OsStr::new("/home/ada")));
/// assert!(env.var("APPDATA").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct HostEnvironment {
   platform: Platform,
   /// `None` reads the process environment
   vars: Option<HashMap<String, OsString>>,
}

impl HostEnvironment {
   /// The running platform and the live process environment.
   pub fn current() -> Self {
      Self {
         platform: Platform::current(),
         vars: None,
      }
   }

   /// A fixed platform with a fixed set of variables. Variables not listed
   /// are treated as unset.
   pub fn fixed<K, V>(platform: Platform, vars: impl IntoIterator<Item = (K, V)>) -> Self
   where
      K: Into<String>,
      V: Into<OsString>,
   {
      Self {
         platform,
         vars: Some(
            vars
               .into_iter()
               .map(|(k, v)| (k.into(), v.into()))
               .collect(),
         ),
      }
   }

   pub fn platform(&self) -> &Platform {
      &self.platform
   }

   /// Look up a variable. Empty values count as unset.
   pub fn var(&self, key: &str) -> Option<OsString> {
      let value = match &self.vars {
         Some(vars) => vars.get(key).cloned(),
         None => std::env::var_os(key),
      };
      value.filter(|v| !v.is_empty())
   }
}

impl Default for HostEnvironment {
   fn default() -> Self {
      Self::current()
   }
}
