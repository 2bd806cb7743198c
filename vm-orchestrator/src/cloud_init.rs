//! `#cloud-config` user-data for the VM's initial OS account.

use crate::request::UserCredential;
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Render the user-data script. The SSH key, when present, is authorized for the
/// same account.
pub fn render_user_data(credential: &UserCredential, ssh_key: Option<&str>) -> String {
    let name = &credential.name;
    let password = &credential.password;

    let authorized_keys = match ssh_key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(key) => format!("\n    ssh_authorized_keys:\n      - {key}"),
        None => String::new(),
    };

    format!(
        "#cloud-config
users:
  - name: {name}
    sudo: ALL=(ALL) NOPASSWD:ALL
    groups: users
    home: /home/{name}
    shell: /bin/bash
    lock_passwd: false{authorized_keys}
chpasswd:
  list: |
    {name}:{password}
  expire: False"
    )
}

/// Base64 (standard alphabet, padded) of [`render_user_data`], as carried by a
/// `cloudInitNoCloud` volume.
pub fn encode_user_data(credential: &UserCredential, ssh_key: Option<&str>) -> String {
    STANDARD.encode(render_user_data(credential, ssh_key))
}
