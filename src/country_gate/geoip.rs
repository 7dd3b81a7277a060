// SPDX-FileCopyrightText: 2025 The superseedr Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::country_gate::provider::{LocationProvider, CAP_COUNTRY_BY_IP, CAP_ISO3166_BY_IP};
use crate::errors::GeoIpError;

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// Location provider backed by a CSV of IPv4 ranges.
///
/// Rows are `start_ip,end_ip,CC` or `cidr,,CC`; `#` starts a comment.
pub struct GeoIpProvider {
    name: String,
    ranges: Vec<(u32, u32, [u8; 2])>,
    destroyed: AtomicBool,
}

impl GeoIpProvider {
    pub fn load(path: &Path) -> Result<Self, GeoIpError> {
        let text = std::fs::read_to_string(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "geoip".to_string());
        Self::parse(&name, &text)
    }

    pub fn parse(name: &str, text: &str) -> Result<Self, GeoIpError> {
        let mut ranges = Vec::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.split_once('#').map(|(left, _)| left).unwrap_or(raw).trim();
            if line.is_empty() {
                continue;
            }
            let entry = parse_entry(line).ok_or(GeoIpError::InvalidEntry { line: line_no + 1 })?;
            ranges.push(entry);
        }
        ranges.sort_by_key(|(start, _, _)| *start);
        Ok(Self {
            name: name.to_string(),
            ranges,
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Marks the provider unusable, e.g. when its database is being replaced.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn lookup(&self, addr: IpAddr) -> Option<&[u8; 2]> {
        let ip = match addr {
            IpAddr::V4(ip) => u32::from(ip),
            IpAddr::V6(ip) => u32::from(ip.to_ipv4_mapped()?),
        };
        let idx = self.ranges.partition_point(|(start, _, _)| *start <= ip);
        let (_, end, cc) = self.ranges.get(idx.checked_sub(1)?)?;
        (ip <= *end).then_some(cc)
    }
}

impl LocationProvider for GeoIpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> u32 {
        CAP_ISO3166_BY_IP | CAP_COUNTRY_BY_IP
    }

    fn iso3166_code_for_ip(&self, ip: IpAddr) -> Option<String> {
        self.lookup(ip)
            .and_then(|cc| std::str::from_utf8(cc).ok())
            .map(str::to_string)
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

fn parse_entry(line: &str) -> Option<(u32, u32, [u8; 2])> {
    let mut parts = line.splitn(3, ',').map(str::trim);
    let first = parts.next()?;
    let second = parts.next()?;
    let cc_str = parts.next()?;
    let cc: [u8; 2] = cc_str.as_bytes().try_into().ok()?;
    if !cc.iter().all(u8::is_ascii_alphabetic) {
        return None;
    }

    if let Some((ip_str, prefix)) = first.split_once('/') {
        let ip: Ipv4Addr = ip_str.parse().ok()?;
        let prefix: u32 = prefix.parse().ok()?;
        if prefix > 32 {
            return None;
        }
        let mask = u32::MAX.checked_shl(32 - prefix).unwrap_or(0);
        let start = u32::from(ip) & mask;
        Some((start, start | !mask, cc))
    } else {
        let start = u32::from(first.parse::<Ipv4Addr>().ok()?);
        let end = u32::from(second.parse::<Ipv4Addr>().ok()?);
        Some((start.min(end), start.max(end), cc))
    }
}
