//! Payload builders
//!
//! One function per payload kind. Builders write the token where it reads
//! naturally (credential suffixes, key material); the factory's embedding
//! pass covers the rest. Counts come from the intensity spec.

use serde_json::{json, Map, Value};

use crate::scenario::IntensitySpec;

use super::value::ValueForge;

/// Fake user/credential rows plus the schema document an exfiltrated dump
/// would carry.
pub(super) fn sql_honeypot(forge: &mut ValueForge, intensity: IntensitySpec) -> Value {
    let schema = "CREATE TABLE users (\n  id SERIAL PRIMARY KEY,\n  username VARCHAR(255),\n  full_name VARCHAR(255),\n  email VARCHAR(255),\n  password_hash VARCHAR(64),\n  api_key VARCHAR(64),\n  created_at TIMESTAMP\n);";

    let rows: Vec<Value> = (0..intensity.record_count)
        .map(|i| {
            let username = forge.username();
            let email = forge.email(&username);
            let api_key = forge.api_key();
            json!({
                "id": i + 1,
                "username": username,
                "full_name": forge.full_name(),
                "email": email,
                "password_hash": forge.password_hash(),
                "api_key": forge.tokened(api_key),
                "created_at": forge.iso_date(),
            })
        })
        .collect();

    json!({
        "table": "users",
        "dialect": "postgresql",
        "schema": schema,
        "row_count": rows.len(),
        "rows": rows,
    })
}

/// A flood of fake resource documents plus contradictory twins meant to
/// poison anything trained on the scrape.
pub(super) fn api_flood(forge: &mut ValueForge, intensity: IntensitySpec) -> Value {
    let resources: Vec<Value> = (0..intensity.record_count)
        .map(|i| {
            json!({
                "id": forge.uuid(),
                "sku": format!("SKU-{}", forge.gen_range(10_000..99_999)),
                "name": forge.product_name(),
                "description": forge.phrase(6),
                "price": forge.amount(),
                "stock": forge.gen_range(0..500),
                "updated_at": forge.iso_date(),
                "position": i,
            })
        })
        .collect();

    // Same primary keys, conflicting values
    let poison_count =
        ((resources.len() as f64) * intensity.contradiction_ratio).round() as usize;
    let poisoned: Vec<Value> = resources
        .iter()
        .take(poison_count)
        .map(|original| {
            json!({
                "id": original["id"],
                "sku": original["sku"],
                "name": forge.product_name(),
                "description": forge.phrase(6),
                "price": forge.amount(),
                "stock": forge.gen_range(0..500),
                "updated_at": forge.iso_date(),
                "position": original["position"],
            })
        })
        .collect();

    json!({
        "total": resources.len(),
        "page_size": resources.len(),
        "resources": resources,
        "poisoned": poisoned,
    })
}

/// Fake accounts whose login always "succeeds" in the deceived response.
pub(super) fn credential_honeypot(forge: &mut ValueForge, intensity: IntensitySpec) -> Value {
    let accounts: Vec<Value> = (0..intensity.record_count)
        .map(|_| {
            let username = forge.username();
            let email = forge.email(&username);
            let api_key = forge.api_key();
            json!({
                "user_id": forge.uuid(),
                "username": username,
                "email": email,
                "password": forge.password(),
                "password_hash": forge.password_hash(),
                "api_token": forge.tokened(api_key),
                "role": forge.role(),
                "mfa_enabled": false,
                "last_login": forge.iso_date(),
            })
        })
        .collect();

    let session = forge.hex(32);
    json!({
        "accounts": accounts,
        "login_response": {
            "status": "success",
            "session_token": forge.tokened(session),
            "expires_in": 86_400,
        },
    })
}

/// `.env`-shaped secret dump. Key material carries the token verbatim.
pub(super) fn env_dump(forge: &mut ValueForge, intensity: IntensitySpec) -> Value {
    let mut variables = Map::new();
    let mut set = |map: &mut Map<String, Value>, key: &str, value: String| {
        map.insert(key.to_string(), Value::String(value));
    };

    let db_host = forge.internal_host("prod-db");
    let db_password = forge.password();
    let api_key = forge.hex(48);
    let secret_key = forge.hex(64);
    let stripe_key = format!("sk_live_{}", forge.hex(24));
    let aws_key_id = format!("AKIA{}", forge.hex(16).to_uppercase());
    let aws_secret = forge.hex(40);
    let jwt_secret = forge.hex(64);
    let cache_host = forge.internal_host("cache-prod");
    let redis_password = forge.password();

    set(&mut variables, "DB_HOST", db_host);
    set(&mut variables, "DB_PORT", "5432".to_string());
    set(&mut variables, "DB_NAME", "production".to_string());
    set(&mut variables, "DB_USER", forge.tokened("admin"));
    set(&mut variables, "DB_PASSWORD", forge.tokened(db_password));
    set(&mut variables, "API_KEY", forge.tokened(api_key));
    set(&mut variables, "SECRET_KEY", forge.tokened(secret_key));
    set(&mut variables, "STRIPE_SECRET_KEY", forge.tokened(stripe_key));
    set(&mut variables, "AWS_ACCESS_KEY_ID", forge.tokened(aws_key_id));
    set(&mut variables, "AWS_SECRET_ACCESS_KEY", forge.tokened(aws_secret));
    set(&mut variables, "JWT_SECRET", forge.tokened(jwt_secret));
    set(&mut variables, "REDIS_HOST", cache_host);
    set(&mut variables, "REDIS_PASSWORD", forge.tokened(redis_password));

    // Pad to the configured key count with plausible service entries
    let mut index = 0;
    while variables.len() < intensity.record_count {
        let service = forge.phrase(1).to_uppercase();
        let secret = forge.hex(32);
        variables.insert(
            format!("{service}_TOKEN_{index}"),
            Value::String(forge.tokened(secret)),
        );
        index += 1;
    }

    let mut content = String::from("# Environment Configuration\n# DO NOT COMMIT THIS FILE\n\n");
    for (key, value) in &variables {
        content.push_str(key);
        content.push('=');
        content.push_str(value.as_str().unwrap_or_default());
        content.push('\n');
    }

    json!({
        "format": "dotenv",
        "filename": ".env",
        "content": content,
        "variables": Value::Object(variables),
    })
}

/// Plausible directory tree for traversal scenarios. Always contains an
/// `/etc/passwd` leaf; remaining files spread over service directories.
pub(super) fn filesystem_tree(forge: &mut ValueForge, intensity: IntensitySpec) -> Value {
    let account = forge.username();
    let passwd = format!(
        "root:x:0:0:{}:/root:/bin/bash\ndaemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n{account}:x:1000:1000::/home/{account}:/bin/bash\n",
        forge.tokened("root"),
    );
    let shadow_hash = forge.hex(34);
    let shadow = format!("root:{}:19000:0:99999:7:::\n", forge.tokened(shadow_hash));
    let hostname = forge.internal_host("app");

    let web_password = forge.password();
    let web_key = forge.hex(32);
    let config_php = format!(
        "<?php\n$db_password = \"{}\";\n$api_key = \"{}\";\n",
        forge.tokened(web_password),
        forge.tokened(web_key),
    );

    let db_host = forge.internal_host("prod-db");
    let history_key = forge.hex(32);
    let bash_history = format!(
        "psql -h {db_host} -U admin production\nexport API_KEY={}\n",
        forge.tokened(history_key),
    );

    let mut etc = vec![
        file("passwd", passwd),
        file("shadow", shadow),
        file("hostname", hostname),
    ];
    let mut www = vec![file("config.php", config_php)];
    let mut home = vec![file(".bash_history", bash_history)];

    // Fill the remaining budget with log and backup files
    let base_files = etc.len() + www.len() + home.len();
    for i in base_files..intensity.record_count {
        let name = format!("{}-{i}.log", forge.phrase(1));
        let date = forge.iso_date();
        let body = format!("{date} {}\n", forge.phrase(5));
        match i % 3 {
            0 => etc.push(file(&name, body)),
            1 => www.push(file(&name, body)),
            _ => home.push(file(&name, body)),
        }
    }

    json!({
        "type": "dir",
        "name": "/",
        "children": [
            { "type": "dir", "name": "etc", "children": etc },
            { "type": "dir", "name": "var", "children": [
                { "type": "dir", "name": "www", "children": www },
            ]},
            { "type": "dir", "name": "home", "children": [
                { "type": "dir", "name": "deploy", "children": home },
            ]},
        ],
    })
}

fn file(name: &str, content: String) -> Value {
    json!({ "type": "file", "name": name, "content": content })
}

/// Minimal tracked object for scenarios nothing specific fits.
pub(super) fn generic(forge: &mut ValueForge, scenario_name: &str, timestamp: f64) -> Value {
    json!({
        "scenario": scenario_name,
        "timestamp": timestamp,
        "request_id": forge.uuid(),
        "data": {
            "status": "ok",
            "items": [forge.phrase(3), forge.phrase(3), forge.phrase(3)],
            "checksum": forge.hex(16),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TrackingToken;

    fn forge() -> ValueForge {
        ValueForge::new(&TrackingToken::from_bytes([9u8; 16]))
    }

    fn spec(records: usize, ratio: f64) -> IntensitySpec {
        IntensitySpec {
            record_count: records,
            payload_bytes: 64 * 1024,
            contradiction_ratio: ratio,
        }
    }

    #[test]
    fn sql_rows_have_credential_shape() {
        let body = sql_honeypot(&mut forge(), spec(25, 0.0));
        let rows = body["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 25);
        for row in rows {
            assert!(row["email"].as_str().unwrap().contains('@'));
            assert_eq!(row["password_hash"].as_str().unwrap().len(), 64);
        }
        assert!(body["schema"].as_str().unwrap().contains("CREATE TABLE"));
    }

    #[test]
    fn flood_poison_shares_primary_keys() {
        let body = api_flood(&mut forge(), spec(40, 0.5));
        let resources = body["resources"].as_array().unwrap();
        let poisoned = body["poisoned"].as_array().unwrap();
        assert_eq!(resources.len(), 40);
        assert_eq!(poisoned.len(), 20);
        for (original, twin) in resources.iter().zip(poisoned.iter()) {
            assert_eq!(original["id"], twin["id"]);
            assert_ne!(original["price"], twin["price"]);
        }
    }

    #[test]
    fn login_always_succeeds() {
        let body = credential_honeypot(&mut forge(), spec(5, 0.0));
        assert_eq!(body["login_response"]["status"], "success");
        assert_eq!(body["accounts"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn env_dump_scales_key_count() {
        let body = env_dump(&mut forge(), spec(30, 0.0));
        let variables = body["variables"].as_object().unwrap();
        assert!(variables.len() >= 30);
        let content = body["content"].as_str().unwrap();
        assert!(content.contains("DB_PASSWORD="));
        assert!(content.contains("AWS_SECRET_ACCESS_KEY="));
    }

    #[test]
    fn filesystem_tree_contains_passwd() {
        let body = filesystem_tree(&mut forge(), spec(20, 0.0));
        let etc = body["children"][0]["children"].as_array().unwrap();
        let passwd = etc
            .iter()
            .find(|f| f["name"] == "passwd")
            .expect("etc/passwd present");
        assert!(passwd["content"].as_str().unwrap().starts_with("root:x:0:0:"));
    }
}
