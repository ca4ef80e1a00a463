// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Path algebra shared by the resolver and the emitter
//!
//! Everything here is lexical: nothing touches the file system. Module ids
//! and output paths are always built from forward-slash strings so host
//! separators never leak into emitted identifiers.

use std::path::{Component, Path, PathBuf};

/// Render a host path with forward slashes
pub fn to_slash(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => out.push('/'),
            Component::CurDir => push_segment(&mut out, "."),
            Component::ParentDir => push_segment(&mut out, ".."),
            Component::Normal(seg) => push_segment(&mut out, &seg.to_string_lossy()),
        }
    }
    out
}

fn push_segment(out: &mut String, seg: &str) {
    if !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    out.push_str(seg);
}

/// Fold `.` and `..` components without consulting the disk
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Forward-slash path of `path` relative to `root`, if it lies inside it
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let root = normalize(root);
    let path = normalize(path);
    path.strip_prefix(&root).ok().map(to_slash)
}

/// Whether a raw reference is relative to the requiring file
pub fn is_relative(raw: &str) -> bool {
    raw == "." || raw == ".." || raw.starts_with("./") || raw.starts_with("../")
}

/// Final extension of a forward-slash path, including the dot
pub fn extension(relative: &str) -> Option<&str> {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    match name.rfind('.') {
        Some(dot) if dot > 0 => Some(&name[dot..]),
        _ => None,
    }
}

/// Insert `suffix` before the final extension of the last segment
pub fn insert_suffix(relative: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return relative.to_string();
    }
    match extension(relative) {
        Some(ext) => {
            let stem = &relative[..relative.len() - ext.len()];
            format!("{}{}{}", stem, suffix, ext)
        }
        None => format!("{}{}", relative, suffix),
    }
}

/// Canonical module id: `[idleading/]name/version/relative`
///
/// The suffix lands before the asset's extension and a trailing `.js` is
/// dropped, so `index.js` becomes `name/version/index` while `a.css` keeps
/// its extension.
pub fn module_id(idleading: &str, name: &str, version: &str, relative: &str, suffix: &str) -> String {
    let relative = insert_suffix(relative, suffix);
    let relative = relative.strip_suffix(".js").unwrap_or(&relative);
    let leading = idleading.trim_end_matches('/');
    if leading.is_empty() {
        format!("{}/{}/{}", name, version, relative)
    } else {
        format!("{}/{}/{}/{}", leading, name, version, relative)
    }
}

/// Output location of a package file relative to the output base
///
/// `output_ext` replaces the asset's extension when the asset is compiled
/// into another form (`a.css` -> `a.css.js`).
pub fn output_relative(
    name: &str,
    version: &str,
    relative: &str,
    output_ext: Option<&str>,
    suffix: &str,
) -> String {
    let mut relative = insert_suffix(relative, suffix);
    if let Some(output_ext) = output_ext {
        if let Some(ext) = extension(&relative).map(str::to_string) {
            relative.truncate(relative.len() - ext.len());
        }
        relative.push_str(output_ext);
    }
    format!("{}/{}/{}", name, version, relative)
}

/// Relative URL from the file at `from` to the file at `to`
///
/// Both arguments are forward-slash paths under the same root.
pub fn relative_url(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
        segs.pop();
        segs
    };
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dir
        .iter()
        .zip(to_segs.iter())
        .take_while(|(a, b)| a == b)
        .count();
    // the file name itself is never part of the shared prefix
    let common = common.min(to_segs.len().saturating_sub(1));

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from_dir.len() {
        parts.push("..");
    }
    parts.extend(&to_segs[common..]);

    let joined = parts.join("/");
    if joined.starts_with("../") {
        joined
    } else {
        format!("./{}", joined)
    }
}

/// Split a package specifier into name and optional subpath
pub fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if let Some(rest) = specifier.strip_prefix('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash_pos) = rest.find('/') {
            let after_scope = &rest[slash_pos + 1..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = slash_pos + 2 + subpath_pos;
                let subpath = &specifier[name_end + 1..];
                return (&specifier[..name_end], (!subpath.is_empty()).then_some(subpath));
            }
        }
        (specifier, None)
    } else if let Some(slash_pos) = specifier.find('/') {
        let subpath = &specifier[slash_pos + 1..];
        (&specifier[..slash_pos], (!subpath.is_empty()).then_some(subpath))
    } else {
        (specifier, None)
    }
}
