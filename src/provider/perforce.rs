//! Perforce provider
//!
//! Drives the `p4` command line. The repository is the `P4PORT`; refs are
//! either `#head`, resolved against the depot paths of a template client
//! workspace, or an explicit `@<changelist>`.
//!
//! Logging in leaves a ticket in the runner's ticket store, so the post
//! phase logs out again and drops any trust that was added for `ssl:`
//! servers.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::{defaults, env};
use crate::core::repository::{FileRequest, RepositoryInfo};
use crate::core::secret::Secret;
use crate::core::state::{CleanupReport, PerforceLogin, PostState};
use crate::error::{PewError, ProcessError, ResolveError};
use crate::infra::process::{parse_json_lines, CommandRunner};
use crate::provider::{lookup_var, require, single_repository, EnvLookup, ProviderKind, SourceProvider};

/// Ref naming the latest submitted change in the client view
pub const HEAD_REF: &str = "#head";

/// A validated Perforce ref
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerforceRef {
    /// `#head`
    Head,
    /// `@<changelist>`
    Change(u64),
}

impl PerforceRef {
    /// Parse `#head` or `@<digits>`
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        if reference == HEAD_REF {
            return Ok(Self::Head);
        }

        reference
            .strip_prefix('@')
            .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(Self::Change)
            .ok_or_else(|| ResolveError::UnsupportedRef {
                provider: ProviderKind::Perforce.display_name().to_string(),
                reference: reference.to_string(),
            })
    }
}

/// A submitted changelist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changelist {
    /// Change number
    pub change: u64,
    /// Submit time
    pub time: DateTime<Utc>,
}

/// Read an integer field that `-Mj` may encode as a string or a number
fn integer_field(record: &Value, field: &str) -> Option<u64> {
    match record.get(field)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

fn changelist(record: &Value) -> Option<Changelist> {
    let change = integer_field(record, "change")?;
    let seconds = i64::try_from(integer_field(record, "time")?).ok()?;
    let time = Utc.timestamp_opt(seconds, 0).single()?;
    Some(Changelist { change, time })
}

/// Depot paths of a client spec, each suffixed with `reference`
///
/// Every `View*` field must be exactly `<depot> <client>`.
pub fn view_paths(client_spec: &Value, reference: &str) -> Result<Vec<String>, ResolveError> {
    let Some(fields) = client_spec.as_object() else {
        return Ok(Vec::new());
    };

    fields
        .iter()
        .filter(|(key, _)| key.starts_with("View"))
        .map(|(_, view)| {
            let view = view.as_str().unwrap_or_default();
            match view.split(' ').collect::<Vec<_>>().as_slice() {
                [depot, _client] => Ok(format!("{depot}{reference}")),
                _ => Err(ResolveError::MalformedClientView {
                    view: view.to_string(),
                }),
            }
        })
        .collect()
}

/// Pick the highest-numbered change among `changes -t` records
pub fn latest_change(records: &[Value]) -> Option<Changelist> {
    records
        .iter()
        .filter_map(changelist)
        .max_by_key(|c| c.change)
}

/// Perforce backend
#[derive(Debug, Clone)]
pub struct PerforceProvider {
    binary: Option<PathBuf>,
    user: Option<String>,
    password: Option<Secret>,
    client_template: Option<String>,
    fingerprint: Option<String>,
}

impl PerforceProvider {
    /// Configure from an environment lookup
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Self {
        Self {
            binary: lookup_var(lookup, env::P4_BINARY).map(PathBuf::from),
            user: lookup_var(lookup, env::P4_USER),
            password: lookup_var(lookup, env::P4_PASS).map(Secret::new),
            client_template: lookup_var(lookup, env::P4_CLIENT_TEMPLATE),
            fingerprint: lookup_var(lookup, env::P4_PORT_FINGERPRINT),
        }
    }

    fn runner(&self) -> Result<CommandRunner, ProcessError> {
        match &self.binary {
            Some(path) => Ok(CommandRunner::new(path.clone())),
            None => CommandRunner::locate(defaults::P4_BINARY),
        }
    }

    /// Run `p4 -Mj -Ztag <args>` and parse its records
    async fn tagged(
        runner: &CommandRunner,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<Vec<Value>, ProcessError> {
        let mut full = vec!["-Mj", "-Ztag"];
        full.extend_from_slice(args);
        let output = runner.run(&full, env, None).await?;
        parse_json_lines(&runner.program().display().to_string(), &output)
    }

    async fn describe(
        runner: &CommandRunner,
        env: &[(&str, &str)],
        change: u64,
    ) -> Result<Changelist, PewError> {
        let change_arg = change.to_string();
        let records = Self::tagged(runner, &["describe", "-s", change_arg.as_str()], env).await?;
        records
            .iter()
            .find_map(changelist)
            .filter(|c| c.change == change)
            .ok_or_else(|| {
                ResolveError::RefNotFound {
                    reference: format!("@{change}"),
                }
                .into()
            })
    }

    async fn head(
        runner: &CommandRunner,
        env: &[(&str, &str)],
        client_template: &str,
    ) -> Result<Changelist, PewError> {
        tracing::info!("Reading view of client '{}'", client_template);
        let specs = Self::tagged(runner, &["client", "-o", client_template], env).await?;
        let spec = specs.first().ok_or_else(|| ResolveError::MalformedResponse {
            context: format!("p4 client -o {client_template}"),
            error: "no client spec returned".to_string(),
        })?;

        let paths = view_paths(spec, HEAD_REF)?;
        if paths.is_empty() {
            return Err(ResolveError::NoChangelist.into());
        }

        let mut args = vec!["changes", "-m1", "-t"];
        args.extend(paths.iter().map(String::as_str));
        let changes = Self::tagged(runner, &args, env).await?;
        latest_change(&changes).ok_or_else(|| ResolveError::NoChangelist.into())
    }
}

impl SourceProvider for PerforceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Perforce
    }

    async fn resolve(
        &self,
        repositories: &[String],
        reference: &str,
        files: &[FileRequest],
        state: &mut PostState,
    ) -> Result<RepositoryInfo, PewError> {
        let port = single_repository(repositories, self.kind())?;
        if !files.is_empty() {
            return Err(ResolveError::FilesUnsupported {
                provider: self.kind().display_name().to_string(),
            }
            .into());
        }
        let target = PerforceRef::parse(reference)?;

        let user = require(self.user.as_ref(), self.kind(), env::P4_USER)?;
        let password = require(self.password.as_ref(), self.kind(), env::P4_PASS)?;
        let client_template =
            require(self.client_template.as_ref(), self.kind(), env::P4_CLIENT_TEMPLATE)?;
        let fingerprint = if port.starts_with("ssl:") {
            Some(require(
                self.fingerprint.as_ref(),
                self.kind(),
                env::P4_PORT_FINGERPRINT,
            )?)
        } else {
            None
        };

        let runner = self.runner()?;

        if let Some(fingerprint) = fingerprint {
            tracing::info!("Adding trust for {}", port);
            runner
                .run(&["trust", "-i", fingerprint.as_str()], &[("P4PORT", port)], None)
                .await?;
            state.perforce_trust_port = Some(port.to_string());
        }

        let p4env = [("P4PORT", port), ("P4USER", user.as_str())];

        tracing::info!("Logging in to {} as {}", port, user);
        runner.run(&["login"], &p4env, Some(&password)).await?;
        state.perforce_login = Some(PerforceLogin {
            port: port.to_string(),
            user: user.clone(),
        });

        let change = match target {
            PerforceRef::Change(change) => Self::describe(&runner, &p4env, change).await?,
            PerforceRef::Head => Self::head(&runner, &p4env, &client_template).await?,
        };
        tracing::info!("Resolved '{}' to change {}", reference, change.change);

        Ok(RepositoryInfo {
            commit: format!("@{}", change.change),
            commit_date: change.time,
            token: Secret::new(defaults::PERFORCE_TOKEN_MARKER),
            files: Vec::new(),
        })
    }

    async fn cleanup(&self, state: &PostState) -> CleanupReport {
        let mut report = CleanupReport::new();
        if state.perforce_login.is_none() && state.perforce_trust_port.is_none() {
            return report;
        }

        let runner = match self.runner() {
            Ok(runner) => runner,
            Err(e) => {
                report.warn(format!("Failed to clean up Perforce session: {e}"));
                return report;
            }
        };

        if let Some(login) = &state.perforce_login {
            let env = [("P4PORT", login.port.as_str()), ("P4USER", login.user.as_str())];
            match runner.run(&["logout"], &env, None).await {
                Ok(_) => report.complete(format!("Logged out of {}", login.port)),
                Err(e) => report.warn(format!("Failed to log out of {}: {e}", login.port)),
            }
        }

        if let Some(port) = &state.perforce_trust_port {
            match runner
                .run(&["trust", "-d"], &[("P4PORT", port.as_str())], None)
                .await
            {
                Ok(_) => report.complete(format!("Removed trust for {port}")),
                Err(e) => report.warn(format!("Failed to remove trust for {port}: {e}")),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ============================================
    // Unit Tests - refs and records
    // ============================================

    #[test]
    fn test_parse_ref() {
        assert_eq!(PerforceRef::parse("#head").unwrap(), PerforceRef::Head);
        assert_eq!(PerforceRef::parse("@1234").unwrap(), PerforceRef::Change(1234));
    }

    #[test]
    fn test_parse_ref_rejects_others() {
        for reference in ["main", "@", "@12a", "#have", "1234", "@-1"] {
            let err = PerforceRef::parse(reference).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Unsupported Perforce ref '{reference}'")
            );
        }
    }

    #[test]
    fn test_view_paths() {
        let spec = json!({
            "Client": "ci-template",
            "Root": "/tmp",
            "View0": "//depot/game/... //ci-template/game/...",
            "View1": "//depot/engine/... //ci-template/engine/..."
        });
        let paths = view_paths(&spec, "#head").unwrap();
        assert_eq!(
            paths,
            vec!["//depot/game/...#head".to_string(), "//depot/engine/...#head".to_string()]
        );
    }

    #[test]
    fn test_view_paths_rejects_malformed_view() {
        let spec = json!({"View0": "\"//depot/with space/...\" //client/..."});
        let err = view_paths(&spec, "#head").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedClientView { .. }));
    }

    #[test]
    fn test_latest_change_picks_highest_number() {
        let records = vec![
            json!({"change": "99", "time": "1709820000"}),
            json!({"change": "1234", "time": "1709820309"}),
            json!({"generic": 17, "severity": 2, "data": "no such file(s)."}),
            json!({"change": "200", "time": "1709820400"}),
        ];
        let latest = latest_change(&records).unwrap();
        assert_eq!(latest.change, 1234);
        assert_eq!(latest.time.to_rfc3339(), "2024-03-07T14:05:09+00:00");
    }

    #[test]
    fn test_latest_change_none() {
        assert!(latest_change(&[]).is_none());
    }

    // ============================================
    // Unit Tests - validation order
    // ============================================

    #[tokio::test]
    async fn test_resolve_rejects_files() {
        let files = vec![FileRequest {
            path: "a".to_string(),
            required: false,
        }];
        let err = PerforceProvider::from_lookup(&|_: &str| None)
            .resolve(&["perforce:1666".to_string()], "#head", &files, &mut PostState::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Perforce provider does not support fetching files"
        );
    }

    #[tokio::test]
    async fn test_resolve_rejects_unsupported_ref_before_credentials() {
        let err = PerforceProvider::from_lookup(&|_: &str| None)
            .resolve(&["perforce:1666".to_string()], "main", &[], &mut PostState::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[tokio::test]
    async fn test_ssl_port_requires_fingerprint() {
        let provider = PerforceProvider::from_lookup(&|name: &str| match name {
            "PEW_P4USER" => Some("builder".to_string()),
            "PEW_P4PASS" => Some("secret".to_string()),
            "PEW_P4_CLIENT_TEMPLATE" => Some("ci-template".to_string()),
            _ => None,
        });
        let err = provider
            .resolve(&["ssl:perforce:1666".to_string()], "#head", &[], &mut PostState::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Perforce repositories must supply `env.PEW_P4PORT_FINGERPRINT`"
        );
    }

    #[tokio::test]
    async fn test_cleanup_without_state_runs_nothing() {
        let provider = PerforceProvider::from_lookup(&|name: &str| {
            (name == env::P4_BINARY).then(|| "/nonexistent/p4".to_string())
        });
        let report = provider.cleanup(&PostState::default()).await;
        assert!(report.completed.is_empty());
        assert!(report.warnings.is_empty());
    }

    // ============================================
    // Integration Tests - fake p4
    // ============================================

    #[cfg(unix)]
    mod fake_p4 {
        use super::*;
        use std::collections::HashMap;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;
        use tempfile::TempDir;

        const SCRIPT: &str = r#"#!/bin/sh
echo "$P4PORT|$P4USER|$*" >> "$(dirname "$0")/calls.log"
case "$*" in
  "trust -i AA:BB") echo "Added trust for P4PORT" ;;
  "trust -d") echo "Removed trust" ;;
  "login")
    read pass
    [ "$pass" = "secret" ] || { echo "Password invalid." >&2; exit 1; }
    echo "User $P4USER logged in." ;;
  "logout") echo "User $P4USER logged out." ;;
  "-Mj -Ztag client -o ci-template")
    echo '{"Client":"ci-template","View0":"//depot/game/... //ci-template/game/...","View1":"//depot/engine/... //ci-template/engine/..."}' ;;
  "-Mj -Ztag changes -m1 -t //depot/engine/...#head //depot/game/...#head"|"-Mj -Ztag changes -m1 -t //depot/game/...#head //depot/engine/...#head")
    echo '{"change":"1200","time":"1709820000"}'
    echo '{"change":"1234","time":"1709820309"}' ;;
  "-Mj -Ztag describe -s 77") echo '{"change":"77","time":"1709820309","desc":"fix"}' ;;
  *) echo "unexpected: $*" >&2; exit 1 ;;
esac
"#;

        fn install(dir: &Path) -> PathBuf {
            let path = dir.join("p4");
            std::fs::write(&path, SCRIPT).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn provider(binary: &Path, password: &str) -> PerforceProvider {
            let vars: HashMap<&str, String> = HashMap::from([
                (env::P4_BINARY, binary.display().to_string()),
                (env::P4_USER, "builder".to_string()),
                (env::P4_PASS, password.to_string()),
                (env::P4_CLIENT_TEMPLATE, "ci-template".to_string()),
                (env::P4_PORT_FINGERPRINT, "AA:BB".to_string()),
            ]);
            PerforceProvider::from_lookup(&move |name: &str| vars.get(name).cloned())
        }

        fn calls(dir: &Path) -> Vec<String> {
            std::fs::read_to_string(dir.join("calls.log"))
                .unwrap_or_default()
                .lines()
                .map(ToString::to_string)
                .collect()
        }

        #[tokio::test]
        async fn test_resolve_head() {
            let temp = TempDir::new().unwrap();
            let binary = install(temp.path());
            let mut state = PostState::for_provider(ProviderKind::Perforce);

            let info = provider(&binary, "secret")
                .resolve(&["perforce:1666".to_string()], "#head", &[], &mut state)
                .await
                .unwrap();

            assert_eq!(info.commit, "@1234");
            assert_eq!(info.commit_date.to_rfc3339(), "2024-03-07T14:05:09+00:00");
            assert_eq!(info.token.expose(), "p4ticket");
            assert!(info.files.is_empty());
            assert_eq!(
                state.perforce_login,
                Some(PerforceLogin {
                    port: "perforce:1666".to_string(),
                    user: "builder".to_string()
                })
            );
            assert!(state.perforce_trust_port.is_none());

            let calls = calls(temp.path());
            assert_eq!(calls[0], "perforce:1666|builder|login");
            assert!(calls.iter().all(|c| !c.contains("secret")));
        }

        #[tokio::test]
        async fn test_resolve_changelist_uses_describe() {
            let temp = TempDir::new().unwrap();
            let binary = install(temp.path());
            let mut state = PostState::default();

            let info = provider(&binary, "secret")
                .resolve(&["ssl:perforce:1666".to_string()], "@77", &[], &mut state)
                .await
                .unwrap();

            assert_eq!(info.commit, "@77");
            assert_eq!(state.perforce_trust_port.as_deref(), Some("ssl:perforce:1666"));

            let calls = calls(temp.path());
            assert!(calls[0].starts_with("ssl:perforce:1666|"));
            assert!(calls[0].ends_with("|trust -i AA:BB"));
            assert!(calls.iter().all(|c| !c.contains("changes")));
        }

        #[tokio::test]
        async fn test_failed_login_keeps_trust_for_cleanup() {
            let temp = TempDir::new().unwrap();
            let binary = install(temp.path());
            let mut state = PostState::default();

            let err = provider(&binary, "wrong")
                .resolve(&["ssl:perforce:1666".to_string()], "#head", &[], &mut state)
                .await
                .unwrap_err();

            assert!(err.to_string().contains("Password invalid."));
            assert!(state.perforce_login.is_none());
            assert_eq!(state.perforce_trust_port.as_deref(), Some("ssl:perforce:1666"));
        }

        #[tokio::test]
        async fn test_cleanup_logs_out_then_drops_trust() {
            let temp = TempDir::new().unwrap();
            let binary = install(temp.path());
            let state = PostState {
                perforce_login: Some(PerforceLogin {
                    port: "ssl:perforce:1666".to_string(),
                    user: "builder".to_string(),
                }),
                perforce_trust_port: Some("ssl:perforce:1666".to_string()),
                ..PostState::for_provider(ProviderKind::Perforce)
            };

            let report = provider(&binary, "secret").cleanup(&state).await;

            assert!(report.warnings.is_empty());
            assert_eq!(report.completed.len(), 2);
            let calls = calls(temp.path());
            assert_eq!(calls.len(), 2);
            assert_eq!(calls[0], "ssl:perforce:1666|builder|logout");
            assert!(calls[1].starts_with("ssl:perforce:1666|"));
            assert!(calls[1].ends_with("|trust -d"));
        }

        #[tokio::test]
        async fn test_cleanup_failures_are_warnings() {
            let state = PostState {
                perforce_login: Some(PerforceLogin {
                    port: "perforce:1666".to_string(),
                    user: "builder".to_string(),
                }),
                ..PostState::default()
            };
            let provider = PerforceProvider::from_lookup(&|name: &str| {
                (name == env::P4_BINARY).then(|| "/nonexistent/p4".to_string())
            });

            let report = provider.cleanup(&state).await;
            assert_eq!(report.warnings.len(), 1);
            assert!(report.completed.is_empty());
        }
    }
}
