//! Layer and extension name lists.

use std::collections::HashSet;
use std::ffi::{c_char, CStr, CString};

/// Append `name` unless it is already listed.
pub(crate) fn push_unique(names: &mut Vec<CString>, name: &CStr) {
    if !names.iter().any(|existing| existing.as_c_str() == name) {
        names.push(name.to_owned());
    }
}

/// Entries of `required` not present in `available`.
pub(crate) fn missing_names(available: &HashSet<String>, required: &[&CStr]) -> Vec<String> {
    required
        .iter()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !available.contains(name))
        .collect()
}

/// Pointers for `pp_enabled_*_names`. Valid while `names` is.
pub(crate) fn as_ptrs(names: &[CString]) -> Vec<*const c_char> {
    names.iter().map(|name| name.as_ptr()).collect()
}

pub(crate) fn as_c_strs(names: &[CString]) -> Vec<&CStr> {
    names.iter().map(CString::as_c_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_unique_keeps_order_and_skips_duplicates() {
        let mut names = Vec::new();
        push_unique(&mut names, c"VK_KHR_surface");
        push_unique(&mut names, c"VK_EXT_debug_utils");
        push_unique(&mut names, c"VK_KHR_surface");

        assert_eq!(
            names,
            vec![
                c"VK_KHR_surface".to_owned(),
                c"VK_EXT_debug_utils".to_owned()
            ]
        );
    }

    #[test]
    fn missing_extension_names() {
        let available: HashSet<String> = ["VK_KHR_swapchain".to_string()].into_iter().collect();

        assert!(missing_names(&available, &[c"VK_KHR_swapchain"]).is_empty());
        let required = [c"VK_KHR_swapchain", c"VK_KHR_dynamic_rendering"];
        assert_eq!(
            missing_names(&available, &required),
            vec!["VK_KHR_dynamic_rendering".to_string()]
        );
    }
}
