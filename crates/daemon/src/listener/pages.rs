// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline HTML pages.

use std::fmt::Write;

use ap_core::RunState;

use crate::env::{APP_NAME, VERSION};

pub(super) fn index() -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>{APP_NAME}</title></head><body>\n\
         <h1>{APP_NAME} {VERSION}</h1>\n\
         <ul>\n\
         <li><a href=\"/ansible/control\">control</a></li>\n\
         <li><a href=\"/ansible/status\">status (JSON)</a></li>\n\
         <li><a href=\"/metrics\">metrics</a></li>\n\
         </ul>\n</body></html>\n"
    )
}

pub(super) fn control(hostname: &str, state: &RunState) -> String {
    let mut page = format!(
        "<!DOCTYPE html>\n<html><head><title>{APP_NAME}: {host}</title></head><body>\n\
         <h1>{APP_NAME} on {host}</h1>\n<table>\n",
        host = escape(hostname),
    );
    let rows = [
        ("Disabled", yes_no(state.disabled)),
        ("Running", yes_no(state.running)),
        ("Last run succeeded", yes_no(state.last_run_success)),
    ];
    for (label, value) in rows {
        let _ = writeln!(page, "<tr><th>{label}</th><td>{value}</td></tr>");
    }
    if state.disabled && !state.disable_reason.is_empty() {
        let _ = writeln!(page, "<tr><th>Reason</th><td>{}</td></tr>", escape(&state.disable_reason));
    }
    page.push_str("</table>\n");

    page.push_str(
        "<form method=\"post\" action=\"/ansible/adhoc-run\"><button type=\"submit\">Run now</button></form>\n",
    );
    if state.disabled {
        page.push_str(
            "<form method=\"post\" action=\"/ansible/enable\"><button type=\"submit\">Enable</button></form>\n",
        );
    } else {
        page.push_str(
            "<form method=\"post\" action=\"/ansible/disable\">\
             <input type=\"text\" name=\"disable-reason\" placeholder=\"reason\">\
             <button type=\"submit\">Disable</button></form>\n",
        );
    }
    page.push_str("</body></html>\n");
    page
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Escape text for HTML element content and attribute values.
pub(super) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
