// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::env;
use std::path::Path;

/// Extra library directories where package managers put libjpeg-turbo.
const TURBOJPEG_SEARCH_PATHS: &[(&str, &str)] = &[
    ("macos", "/opt/homebrew/opt/jpeg-turbo/lib"), // Apple Silicon
    ("macos", "/usr/local/opt/jpeg-turbo/lib"),    // Intel Macs
    ("linux", "/opt/libjpeg-turbo/lib64"),         // Upstream installer
];

fn main() {
    println!("cargo:rerun-if-env-changed=TURBOJPEG_LIB_DIR");

    // The JPEG back end is pure Rust unless the turbojpeg feature is enabled
    if env::var_os("CARGO_FEATURE_TURBOJPEG").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("TURBOJPEG_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    } else {
        let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
        if let Some((_, dir)) = TURBOJPEG_SEARCH_PATHS
            .iter()
            .find(|(os, dir)| *os == target_os && Path::new(dir).exists())
        {
            println!("cargo:rustc-link-search=native={dir}");
        }
    }

    println!("cargo:rustc-link-lib=turbojpeg");
}
