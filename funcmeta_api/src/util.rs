// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-FileCopyrightText: © 2023 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

/// Check that a topic name is structurally valid.
///
/// Accepted forms, optionally prefixed by `persistent://` or
/// `non-persistent://`:
/// - `topic`, interpreted within the default tenant and namespace;
/// - `tenant/namespace/topic`.
///
/// Tenant and namespace may only contain word characters and `-=:.`.
pub fn is_valid_topic(raw: &str) -> bool {
    let name = match raw.split_once("://") {
        Some(("persistent", rest)) | Some(("non-persistent", rest)) => rest,
        Some(_) => return false,
        None => raw,
    };
    let parts: Vec<&str> = name.split('/').collect();
    if parts.iter().any(|part| part.trim().is_empty()) {
        return false;
    }
    match parts.len() {
        1 => true,
        3 => {
            let re = match regex::Regex::new(r"^[-=:.\w]+$") {
                Ok(re) => re,
                Err(_) => return false,
            };
            re.is_match(parts[0]) && re.is_match(parts[1])
        }
        _ => false,
    }
}

pub fn create_template(path: &str, content: &str) -> anyhow::Result<()> {
    assert!(!path.is_empty());
    match std::path::Path::new(&path).exists() {
        true => anyhow::bail!("cannot overwrite configuration file: {}", path),
        false => {
            std::fs::write(path, content)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_topic() {
        assert!(is_valid_topic("test-output-topic"));
        assert!(is_valid_topic("persistent://public/default/test_src"));
        assert!(is_valid_topic("non-persistent://public/default/test_src"));
        assert!(is_valid_topic("public/default/my-topic"));

        assert!(!is_valid_topic(""));
        assert!(!is_valid_topic("test-function-output-topic/test:"));
        assert!(!is_valid_topic("persistent://public/default/"));
        assert!(!is_valid_topic("http://public/default/topic"));
        assert!(!is_valid_topic("public/default/extra/topic"));
        assert!(!is_valid_topic("pub lic/default/topic"));
    }

    #[test]
    fn test_create_template_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.toml");
        let path = path.to_str().unwrap();
        assert!(create_template(path, "key = 1\n").is_ok());
        assert!(create_template(path, "key = 2\n").is_err());
        assert_eq!("key = 1\n", std::fs::read_to_string(path).unwrap());
    }
}
