/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::env;

fn main() {
    for (var, name) in [
        ("HOST", "G3_BUILD_HOST"),
        ("TARGET", "G3_BUILD_TARGET"),
        ("PROFILE", "G3_BUILD_PROFILE"),
        ("OPT_LEVEL", "G3_BUILD_OPT_LEVEL"),
        ("DEBUG", "G3_BUILD_DEBUG"),
    ] {
        let value = env::var(var).unwrap_or_default();
        println!("cargo:rustc-env={name}={value}");
    }

    println!("cargo:rerun-if-env-changed=G3_PACKAGE_VERSION");
    if let Ok(v) = env::var("G3_PACKAGE_VERSION") {
        println!("cargo:rustc-env=G3_PACKAGE_VERSION={v}");
    }
}
