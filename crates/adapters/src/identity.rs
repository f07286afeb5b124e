// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Names this host may be listed under in an inventory.

use std::net::IpAddr;

use nix::ifaddrs::getifaddrs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("cannot enumerate network interfaces: {0}")]
    Interfaces(nix::Error),

    #[error("cannot determine hostname: {0}")]
    Hostname(nix::Error),
}

/// The local hostname as reported by the kernel.
pub fn local_hostname() -> Result<String, IdentityError> {
    let name = nix::unistd::gethostname().map_err(IdentityError::Hostname)?;
    Ok(name.to_string_lossy().into_owned())
}

/// Every non-loopback interface address in enumeration order, then `hostname`.
pub fn local_candidates(hostname: &str) -> Result<Vec<String>, IdentityError> {
    let mut candidates = Vec::new();
    for ifaddr in getifaddrs().map_err(IdentityError::Interfaces)? {
        let Some(address) = ifaddr.address else {
            continue;
        };
        let ip = if let Some(v4) = address.as_sockaddr_in() {
            IpAddr::V4(v4.ip())
        } else if let Some(v6) = address.as_sockaddr_in6() {
            IpAddr::V6(v6.ip())
        } else {
            continue;
        };
        push_candidate(&mut candidates, ip);
    }
    candidates.push(hostname.to_string());
    tracing::debug!(?candidates, "local identity candidates");
    Ok(candidates)
}

fn push_candidate(candidates: &mut Vec<String>, ip: IpAddr) {
    if ip.is_loopback() {
        return;
    }
    let text = ip.to_string();
    if !candidates.contains(&text) {
        candidates.push(text);
    }
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
