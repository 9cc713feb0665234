use serde_json::Value;

/// Makes inbound events safe to log: image payloads are replaced by their
/// length and credential-shaped strings by `[REDACTED]`.
pub struct LogRedactor {
    patterns: Vec<SecretPattern>,
}

struct SecretPattern {
    name: &'static str,
    prefix: &'static str,
    /// Minimum length of the secret portion (after prefix).
    min_len: usize,
    /// Characters allowed in the secret portion.
    charset: CharSet,
}

enum CharSet {
    AlphaNum,
    AlphaNumDash,
    Hex,
    Base64,
}

impl CharSet {
    fn matches(&self, c: char) -> bool {
        match self {
            CharSet::AlphaNum => c.is_ascii_alphanumeric(),
            CharSet::AlphaNumDash => c.is_ascii_alphanumeric() || c == '-' || c == '_',
            CharSet::Hex => c.is_ascii_hexdigit(),
            CharSet::Base64 => c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=',
        }
    }
}

impl Default for LogRedactor {
    fn default() -> Self {
        Self::new()
    }
}

impl LogRedactor {
    pub fn new() -> Self {
        Self {
            patterns: vec![
                SecretPattern {
                    name: "Anthropic API key",
                    prefix: "sk-ant-",
                    min_len: 20,
                    charset: CharSet::AlphaNumDash,
                },
                SecretPattern {
                    name: "OpenAI API key",
                    prefix: "sk-",
                    min_len: 20,
                    charset: CharSet::AlphaNumDash,
                },
                SecretPattern {
                    name: "AWS access key",
                    prefix: "AKIA",
                    min_len: 16,
                    charset: CharSet::AlphaNum,
                },
                SecretPattern {
                    name: "AWS temporary key",
                    prefix: "ASIA",
                    min_len: 16,
                    charset: CharSet::AlphaNum,
                },
                SecretPattern {
                    name: "GitHub PAT",
                    prefix: "ghp_",
                    min_len: 20,
                    charset: CharSet::AlphaNum,
                },
                SecretPattern {
                    name: "Bearer token",
                    prefix: "Bearer ",
                    min_len: 20,
                    charset: CharSet::Base64,
                },
                // Generic long hex strings (often API keys or hashes)
                SecretPattern {
                    name: "hex secret",
                    prefix: "",
                    min_len: 40,
                    charset: CharSet::Hex,
                },
            ],
        }
    }

    /// A copy of `event` fit for the log. Returns the kinds of secrets removed.
    pub fn render_event(&self, event: &Value) -> (Value, Vec<&'static str>) {
        let mut rendered = event.clone();
        let mut found = Vec::new();

        if let Some(obj) = rendered.as_object_mut() {
            for (key, value) in obj.iter_mut() {
                if key == "body" {
                    // Gateways hand the body over as a string; decode it so the
                    // image field can be found.
                    let decoded = value
                        .as_str()
                        .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
                    if let Some(decoded) = decoded {
                        *value = decoded;
                    }
                    self.scrub(value, true, &mut found);
                } else {
                    self.scrub(value, false, &mut found);
                }
            }
        } else {
            self.scrub(&mut rendered, false, &mut found);
        }

        (rendered, found)
    }

    fn scrub(&self, value: &mut Value, in_body: bool, found: &mut Vec<&'static str>) {
        match value {
            Value::String(s) => {
                let (redacted, kinds) = self.redact(s);
                if !kinds.is_empty() {
                    *s = redacted;
                    found.extend(kinds);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.scrub(item, in_body, found);
                }
            }
            Value::Object(map) => {
                for (key, item) in map.iter_mut() {
                    if in_body && key == "image" {
                        if let Some(len) = item.as_str().map(str::len) {
                            *item = Value::String(format!("[image: {len} base64 chars]"));
                            continue;
                        }
                    }
                    self.scrub(item, in_body, found);
                }
            }
            _ => {}
        }
    }

    fn redact(&self, input: &str) -> (String, Vec<&'static str>) {
        let mut output = input.to_string();
        let mut found = Vec::new();

        for pattern in &self.patterns {
            if pattern.prefix.is_empty() {
                output = redact_long_runs(&output, pattern, &mut found);
            } else {
                output = redact_prefixed(&output, pattern, &mut found);
            }
        }

        (output, found)
    }
}

fn redact_prefixed(input: &str, pattern: &SecretPattern, found: &mut Vec<&'static str>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(pos) = remaining.find(pattern.prefix) {
        result.push_str(&remaining[..pos]);

        let after_prefix = &remaining[pos + pattern.prefix.len()..];
        let secret_len: usize = after_prefix
            .chars()
            .take_while(|c| pattern.charset.matches(*c))
            .map(char::len_utf8)
            .sum();

        if secret_len >= pattern.min_len {
            found.push(pattern.name);
            result.push_str("[REDACTED]");
            remaining = &after_prefix[secret_len..];
        } else {
            result.push_str(pattern.prefix);
            remaining = after_prefix;
        }
    }

    result.push_str(remaining);
    result
}

fn redact_long_runs(input: &str, pattern: &SecretPattern, found: &mut Vec<&'static str>) -> String {
    let mut result = String::with_capacity(input.len());
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if pattern.charset.matches(chars[i]) {
            let start = i;
            while i < chars.len() && pattern.charset.matches(chars[i]) {
                i += 1;
            }
            let run = &chars[start..i];

            // Plain words and long digit strings stay; a secret mixes both.
            if run.len() >= pattern.min_len
                && run.iter().any(|c| c.is_ascii_digit())
                && run.iter().any(|c| c.is_ascii_alphabetic())
            {
                found.push(pattern.name);
                result.push_str("[REDACTED]");
                continue;
            }

            result.extend(run);
        } else {
            result.push(chars[i]);
            i += 1;
        }
    }

    result
}
