// Copyright 2023 Remi Bernotavicius

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Bounds applied to recipe payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min_cooking_time: i32,
    pub max_cooking_time: i32,
    pub max_amount: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_cooking_time: 1,
            max_cooking_time: 360,
            max_amount: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database: PathBuf,
    pub limits: Limits,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        let defaults = Limits::default();
        let limits = Limits {
            min_cooking_time: try_load("FOODGRAM_MIN_COOKING_TIME", defaults.min_cooking_time)?,
            max_cooking_time: try_load("FOODGRAM_MAX_COOKING_TIME", defaults.max_cooking_time)?,
            max_amount: try_load("FOODGRAM_MAX_AMOUNT", defaults.max_amount)?,
        };
        if limits.min_cooking_time < 1 || limits.min_cooking_time > limits.max_cooking_time {
            return Err(format!("invalid cooking time bounds {limits:?}").into());
        }
        if limits.max_amount < 1 {
            return Err(format!("invalid maximum amount {}", limits.max_amount).into());
        }

        let database = match env::var_os("FOODGRAM_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => crate::data_path()?.join("data.sqlite"),
        };

        Ok(Self {
            addr: try_load("FOODGRAM_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?,
            database,
            limits,
        })
    }
}

fn try_load<T>(key: &str, default: T) -> crate::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| format!("invalid {key} value {value:?}: {e}").into()),
        Err(_) => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[test]
fn default_limits() {
    let limits = Limits::default();
    assert!(limits.min_cooking_time <= limits.max_cooking_time);
    assert_eq!(limits.max_amount, 1000);
}

#[test]
fn try_load_falls_back_and_parses() {
    let key = "FOODGRAM_TEST_TRY_LOAD";
    env::remove_var(key);
    assert_eq!(try_load(key, 42_i32).unwrap(), 42);

    env::set_var(key, "17");
    assert_eq!(try_load(key, 42_i32).unwrap(), 17);

    env::set_var(key, "seventeen");
    assert!(try_load(key, 42_i32).is_err());
    env::remove_var(key);
}
