/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use log::info;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
pub fn register_quit(quit: &CancellationToken) -> anyhow::Result<()> {
    use std::future::poll_fn;

    use tokio::signal::unix::{SignalKind, signal};

    for (kind, name) in [
        (SignalKind::quit(), "SIGQUIT"),
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let mut sig =
            signal(kind).map_err(|e| anyhow!("failed to create {name} listener: {e}"))?;
        let quit = quit.clone();
        tokio::spawn(async move {
            if poll_fn(|cx| sig.poll_recv(cx)).await.is_some() {
                info!("got quit signal {name}");
                quit.cancel();
            }
        });
    }

    Ok(())
}

#[cfg(windows)]
pub fn register_quit(quit: &CancellationToken) -> anyhow::Result<()> {
    use tokio::signal::windows::ctrl_c;

    let mut sig = ctrl_c().map_err(|e| anyhow!("failed to create ctrl-c listener: {e}"))?;
    let quit = quit.clone();
    tokio::spawn(async move {
        if sig.recv().await.is_some() {
            info!("got quit signal");
            quit.cancel();
        }
    });

    Ok(())
}
