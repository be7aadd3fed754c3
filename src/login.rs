//! Chain orchestration.
//!
//! The [`Orchestrator`] resolves a node's login chain, runs one hop after
//! the other in the same pane and finishes with the target's `AFTER_HOOKS`.
//! Nothing that goes wrong inside a chain escapes as an error: the outcome
//! is summarised in a [`ChainReport`].

use crate::error::{JumplineError, Result};
use crate::hop::HopExecutor;
use crate::pane::{Input, Pane, PaneHost, wait_until};
use crate::profile::LoginProfile;
use crate::property::Selector;
use crate::resolver::resolve_chain;
use crate::settings::Settings;
use crate::tiling::TiledAllocator;
use crate::tree::{ConfigTree, NodeId};
use std::fmt;
use std::thread;
use tracing::{info, warn};

/// Window prefix for a batch started at the root.
const ROOT_PREFIX: &str = "root";

/// A hop (or the chain resolution) that went wrong.
#[derive(Debug)]
pub struct HopFailure {
    pub node: String,
    pub error: JumplineError,
}

/// Outcome of one chain.
#[derive(Debug)]
pub struct ChainReport {
    pub target: String,
    /// Nodes logged in to, in order.
    pub completed: Vec<String>,
    pub failure: Option<HopFailure>,
    /// The login succeeded but a post-login hook did not.
    pub hook_failure: Option<JumplineError>,
}

impl ChainReport {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            completed: Vec::new(),
            failure: None,
            hook_failure: None,
        }
    }

    fn fail(mut self, node: &str, error: JumplineError) -> Self {
        warn!(target_node = %self.target, node, error = %error, "login failed");
        self.failure = Some(HopFailure {
            node: node.to_string(),
            error,
        });
        self
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

impl fmt::Display for ChainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure {
            None => write!(f, "{}: logged in via {}", self.target, self.completed.join(" -> "))?,
            Some(failure) => write!(f, "{}: login {} failed: {}", self.target, failure.node, failure.error)?,
        }
        if let Some(error) = &self.hook_failure {
            write!(f, " (after hooks stopped: {})", error)?;
        }
        Ok(())
    }
}

/// Drives login chains over a node tree.
pub struct Orchestrator<'a> {
    tree: &'a ConfigTree,
    settings: &'a Settings,
    selector: &'a dyn Selector,
    credential_index: Option<usize>,
    allocator: TiledAllocator,
}

impl<'a> Orchestrator<'a> {
    pub fn new(tree: &'a ConfigTree, settings: &'a Settings, selector: &'a dyn Selector) -> Self {
        Self {
            tree,
            settings,
            selector,
            credential_index: None,
            allocator: TiledAllocator::new(),
        }
    }

    /// Credential to use on every hop where it is in range.
    pub fn with_credential_index(mut self, index: Option<usize>) -> Self {
        self.credential_index = index;
        self
    }

    fn executor(&self) -> HopExecutor<'a> {
        HopExecutor::new(self.selector, self.credential_index, self.settings.wait)
    }

    /// First hop: its own format. Later hops: what the previous hop asks
    /// for, then their own.
    fn login_format<'p>(&'p self, previous: Option<&'p LoginProfile>, profile: &'p LoginProfile) -> &'p str {
        previous
            .and_then(|p| p.next_login_format.as_deref())
            .or(profile.login_format.as_deref())
            .unwrap_or(&self.settings.login_format)
    }

    /// Log in to `target` in `pane`, hop by hop.
    pub fn login<P: Pane + ?Sized>(&self, pane: &P, target: NodeId) -> ChainReport {
        let target_id = self.tree.node(target).id();
        let mut report = ChainReport::new(target_id);

        if let Err(err) = pane.send_keys("clear", Input::Command) {
            return report.fail(target_id, err);
        }
        let chain = match resolve_chain(self.tree, target, self.settings.previous_login) {
            Ok(chain) => chain,
            Err(err) => return report.fail(target_id, err),
        };

        let executor = self.executor();
        let mut previous = None;
        for &hop in chain.hops() {
            let hop_id = self.tree.node(hop).id();
            let result = self.tree.profile(hop).and_then(|profile| {
                let format = self.login_format(previous, profile);
                executor
                    .perform(pane, self.tree, hop, format, profile.auto_exit_enabled)
                    .map(|()| profile)
            });
            match result {
                Ok(profile) => {
                    report.completed.push(hop_id.to_string());
                    previous = Some(profile);
                }
                Err(err) => return report.fail(hop_id, err),
            }
        }

        if let Err(err) = self.run_hooks(&executor, pane, target) {
            warn!(node = target_id, error = %err, "after hook failed");
            report.hook_failure = Some(err);
        }
        info!(node = target_id, hops = chain.len(), "chain complete");
        report
    }

    /// Send the target's default hook commands. Every command but the last
    /// must bring the shell prompt back.
    fn run_hooks<P: Pane + ?Sized>(&self, executor: &HopExecutor<'_>, pane: &P, target: NodeId) -> Result<()> {
        let profile = self.tree.profile(target)?;
        let hooks = profile.hooks();
        let wait = executor.wait_for(profile);
        for (i, command) in hooks.iter().enumerate() {
            pane.send_keys(command, Input::Command)?;
            if i + 1 == hooks.len() {
                break;
            }
            let node = self.tree.node(target).id();
            let prompt = profile
                .shell_prompt
                .as_deref()
                .ok_or_else(|| JumplineError::MissingPrompt {
                    node: node.to_string(),
                    field: "SHELL_PROMPT",
                })?;
            if !wait_until(pane, prompt, wait)? {
                return Err(JumplineError::PromptTimeout {
                    node: node.to_string(),
                    prompt: format!("{} after {:?}", prompt, command),
                });
            }
        }
        Ok(())
    }

    fn require(&self, id: &str) -> Result<NodeId> {
        self.tree
            .get(id)
            .ok_or_else(|| JumplineError::NodeNotFound(id.to_string()))
    }

    /// Log in to the node `id` in a pane of the window named after it.
    ///
    /// # Errors
    ///
    /// - [`JumplineError::NodeNotFound`] for an unknown identifier
    /// - [`JumplineError::NoHost`] for a grouping node
    /// - whatever `host` fails with while creating the pane
    pub fn login_node<H: PaneHost>(&self, host: &H, id: &str) -> Result<ChainReport> {
        let node = self.require(id)?;
        // A broken file still gets a pane so the report shows its error.
        if !self.tree.node(node).has_host() {
            return Err(JumplineError::NoHost(id.to_string()));
        }
        let pane = host.pane_in_window(self.tree.node(node).name())?;
        Ok(self.login(&pane, node))
    }

    /// Nodes a batch login under `node` covers: `node` itself if it has a
    /// host, then every descendant with a host and without `NO_BATCH`.
    pub fn batch_targets(&self, node: NodeId) -> Vec<NodeId> {
        let own = self.tree.profile(node).is_ok_and(|p| p.host.is_some());
        let descendants = self.tree.descendants(node).into_iter().filter(|&n| {
            match self.tree.profile(n) {
                Ok(profile) => profile.host.is_some() && !profile.no_batch,
                // Keep it so the report shows the broken file.
                Err(_) => self.tree.node(n).has_host(),
            }
        });
        own.then_some(node).into_iter().chain(descendants).collect()
    }

    /// Log in to every batch target under `id` at once, one tiled pane each.
    ///
    /// # Errors
    ///
    /// [`JumplineError::NodeNotFound`] for an unknown identifier, or a pane
    /// host failure. Login failures are in the reports.
    pub fn batch_login<H>(&mut self, host: &H, id: &str) -> Result<Vec<(String, ChainReport)>>
    where
        H: PaneHost,
    {
        let node = self.require(id)?;
        let targets = self.batch_targets(node);
        let prefix = if id.is_empty() { ROOT_PREFIX } else { id };
        let panes = self.allocator.panes(host, prefix, targets.len())?;
        info!(node = id, targets = targets.len(), "batch login");

        let this = &*self;
        let reports: Vec<(String, ChainReport)> = thread::scope(|scope| {
            let handles: Vec<_> = targets
                .iter()
                .zip(panes)
                .map(|(&target, pane)| {
                    scope.spawn(move || {
                        if let Err(err) = pane.select() {
                            warn!(pane = pane.id(), error = %err, "could not select pane");
                        }
                        this.login(&pane, target)
                    })
                })
                .collect();
            targets
                .iter()
                .zip(handles)
                .map(|(&target, handle)| {
                    let target_id = this.tree.node(target).id();
                    let report = handle.join().unwrap_or_else(|_| {
                        ChainReport::new(target_id).fail(
                            target_id,
                            JumplineError::TmuxError("login thread panicked".to_string()),
                        )
                    });
                    (target_id.to_string(), report)
                })
                .collect()
        });
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WaitSettings;
    use crate::testing::{FakeHost, FixedSelector, ScriptedPane};
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn settings() -> Settings {
        Settings {
            wait: WaitSettings {
                timeout_secs: 1,
                poll_interval_ms: 1,
            },
            ..Settings::default()
        }
    }

    const BASE: &str = "
SHELL_PROMPT: ']$'
PASSWORD_PROMPT: 'password:'
CREDENTIAL:
  - USER: ops
    PASSWORD: pw
";

    fn sample() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".base.yaml", BASE);
        write(dir.path(), "bastion.yaml", "");
        write(dir.path(), "dc/.base.yaml", "PREVIOUS_LOGIN: bastion\n");
        write(dir.path(), "dc/db1.yaml", "");
        dir
    }

    fn shell() -> ScriptedPane {
        ScriptedPane::new("p")
            .on(" ops@", "ops@host's password:")
            .on("pw", "[ops@host ~]$")
    }

    #[test]
    fn test_two_hop_login() {
        let dir = sample();
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let orchestrator = Orchestrator::new(&tree, &settings, &selector);
        let pane = shell();

        let report = orchestrator.login(&pane, tree.get("dc.db1").unwrap());
        assert!(report.is_success(), "{}", report);
        assert_eq!(report.completed, ["bastion", "dc.db1"]);
        assert_eq!(
            pane.sent_text(),
            ["clear", "ssh -p 22 ops@bastion", "pw", "ssh -p 22 ops@db1", "pw"]
        );
        assert_eq!(report.to_string(), "dc.db1: logged in via bastion -> dc.db1");
    }

    #[test]
    fn test_login_formats_chain() {
        let dir = sample();
        write(
            dir.path(),
            "bastion.yaml",
            "LOGIN_FORMAT: 'gw {user}@{host}'\nNEXT_LOGIN_FORMAT: 'ssh {user}@{host} -p {port}'\n",
        );
        write(dir.path(), "dc/db1.yaml", "LOGIN_FORMAT: 'never {host}'\nPORT: 2022\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = shell();

        let report = Orchestrator::new(&tree, &settings, &selector).login(&pane, tree.get("dc.db1").unwrap());
        assert!(report.is_success(), "{}", report);
        let sent = pane.sent_text();
        assert_eq!(sent[1], "gw ops@bastion");
        assert_eq!(sent[3], "ssh ops@db1 -p 2022");
    }

    #[test]
    fn test_failed_hop_halts_chain() {
        let dir = sample();
        write(dir.path(), "dc/db1.yaml", "LOGIN_TIMEOUT: 0\nAFTER_HOOKS: [uptime]\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = ScriptedPane::new("p")
            .on("@db1", "Connection refused")
            .on(" ops@", "password:")
            .on("pw", "]$");

        let report = Orchestrator::new(&tree, &settings, &selector).login(&pane, tree.get("dc.db1").unwrap());
        assert_eq!(report.completed, ["bastion"]);
        let failure = report.failure.as_ref().unwrap();
        assert_eq!(failure.node, "dc.db1");
        assert!(matches!(failure.error, JumplineError::PromptTimeout { .. }));
        assert!(!pane.sent_text().contains(&"uptime".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_secrets_hook_halts_chain() {
        let dir = sample();
        write(dir.path(), "bastion.yaml", "CREDENTIAL: [{USER: ops, SECRETS_HOOK: 'exit 3'}]\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = shell();

        let report = Orchestrator::new(&tree, &settings, &selector).login(&pane, tree.get("dc.db1").unwrap());
        assert!(report.completed.is_empty());
        let failure = report.failure.unwrap();
        assert_eq!(failure.node, "bastion");
        assert!(matches!(failure.error, JumplineError::SecretsHook(_)));
        assert_eq!(pane.sent_text(), ["clear", "ssh -p 22 ops@bastion"]);
    }

    #[test]
    fn test_resolution_error_is_reported() {
        let dir = sample();
        write(dir.path(), "web.yaml", "PREVIOUS_LOGIN: nowhere\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = shell();

        let report = Orchestrator::new(&tree, &settings, &selector).login(&pane, tree.get("web").unwrap());
        let failure = report.failure.unwrap();
        assert_eq!(failure.node, "web");
        assert!(matches!(failure.error, JumplineError::PreviousLoginNotFound { .. }));
        assert_eq!(pane.sent_text(), ["clear"]);
    }

    #[test]
    fn test_after_hooks_run_in_order() {
        let dir = sample();
        write(dir.path(), "dc/db1.yaml", "AFTER_HOOKS: ['cd /srv', 'tail -f app.log']\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = shell();

        let report = Orchestrator::new(&tree, &settings, &selector).login(&pane, tree.get("dc.db1").unwrap());
        assert!(report.is_success());
        assert!(report.hook_failure.is_none());
        let sent = pane.sent();
        assert_eq!(
            sent[sent.len() - 2..],
            [
                ("cd /srv".to_string(), Input::Command),
                ("tail -f app.log".to_string(), Input::Command),
            ]
        );
    }

    #[test]
    fn test_failing_hook_keeps_login() {
        let dir = sample();
        write(
            dir.path(),
            "dc/db1.yaml",
            "LOGIN_TIMEOUT: 0\nAFTER_HOOKS: ['cd /nowhere', 'ls']\n",
        );
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = shell().on("cd /nowhere", "No such file or directory");

        let report = Orchestrator::new(&tree, &settings, &selector).login(&pane, tree.get("dc.db1").unwrap());
        assert!(report.is_success());
        assert!(matches!(report.hook_failure, Some(JumplineError::PromptTimeout { .. })));
        assert_eq!(pane.sent_text().last().map(String::as_str), Some("cd /nowhere"));
    }

    #[test]
    fn test_credential_index_applies_to_every_hop() {
        let dir = sample();
        write(
            dir.path(),
            ".base.yaml",
            &format!("{}  - USER: admin\n    PASSWORD: pw\n", BASE),
        );
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let pane = ScriptedPane::new("p").on("@", "password:").on("pw", "]$");

        let orchestrator = Orchestrator::new(&tree, &settings, &selector).with_credential_index(Some(1));
        let report = orchestrator.login(&pane, tree.get("dc.db1").unwrap());
        assert!(report.is_success(), "{}", report);
        assert_eq!(selector.calls(), 0);
        let sent = pane.sent_text();
        assert_eq!(sent[1], "ssh -p 22 admin@bastion");
        assert_eq!(sent[3], "ssh -p 22 admin@db1");
    }

    #[test]
    fn test_login_node_lookup() {
        let dir = sample();
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let orchestrator = Orchestrator::new(&tree, &settings, &selector);
        let host = FakeHost::new(shell());

        assert!(matches!(
            orchestrator.login_node(&host, "dc.db9"),
            Err(JumplineError::NodeNotFound(id)) if id == "dc.db9"
        ));
        assert!(matches!(orchestrator.login_node(&host, "dc"), Err(JumplineError::NoHost(_))));
        assert!(host.windows.lock().unwrap().is_empty());

        let report = orchestrator.login_node(&host, "dc.db1").unwrap();
        assert!(report.is_success(), "{}", report);
        assert_eq!(*host.windows.lock().unwrap(), vec![("db1".to_string(), 1)]);
    }

    #[test]
    fn test_login_node_reports_broken_file() {
        let dir = sample();
        write(dir.path(), "dc/db2.yaml", "PORT: [oops\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let orchestrator = Orchestrator::new(&tree, &settings, &selector);
        let host = FakeHost::new(shell());

        let report = orchestrator.login_node(&host, "dc.db2").unwrap();
        let failure = report.failure.unwrap();
        assert_eq!(failure.node, "dc.db2");
        assert!(matches!(failure.error, JumplineError::Config(_)));
        assert_eq!(*host.windows.lock().unwrap(), vec![("db2".to_string(), 1)]);
    }

    fn batch_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".base.yaml", BASE);
        for i in 0..11 {
            write(dir.path(), &format!("p/h{:02}.yaml", i), "");
        }
        write(dir.path(), "p/old.yaml", "NO_BATCH: true\n");
        dir
    }

    #[test]
    fn test_batch_login_tiles_windows() {
        let dir = batch_tree();
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let mut orchestrator = Orchestrator::new(&tree, &settings, &selector);
        let host = FakeHost::new(shell());

        let reports = orchestrator.batch_login(&host, "p").unwrap();
        assert_eq!(reports.len(), 11);
        assert_eq!(reports[0].0, "p.h00");
        assert_eq!(reports[10].0, "p.h10");
        assert!(reports.iter().all(|(_, r)| r.is_success()));
        assert_eq!(
            *host.windows.lock().unwrap(),
            vec![("p-0".to_string(), 9), ("p-1".to_string(), 2)]
        );
        for pane in host.panes.lock().unwrap().iter() {
            assert_eq!(pane.sent_text().len(), 3);
        }

        orchestrator.batch_login(&host, "p").unwrap();
        assert_eq!(host.windows.lock().unwrap()[2], ("p-2".to_string(), 9));
    }

    #[test]
    fn test_batch_isolates_failing_chains() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".base.yaml", BASE);
        write(dir.path(), "p/a.yaml", "");
        write(dir.path(), "p/b.yaml", "PORT: [oops\n");
        write(dir.path(), "p/c.yaml", "PREVIOUS_LOGIN: loop\n");
        write(dir.path(), "loop.yaml", "PREVIOUS_LOGIN: c\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let mut orchestrator = Orchestrator::new(&tree, &settings, &selector);
        let host = FakeHost::new(shell());

        let reports = orchestrator.batch_login(&host, "p").unwrap();
        let report = |id: &str| {
            reports
                .iter()
                .find(|(target, _)| target == id)
                .map(|(_, report)| report)
                .unwrap()
        };
        assert_eq!(reports.len(), 3);
        assert!(report("p.a").is_success(), "{}", report("p.a"));
        assert!(matches!(
            &report("p.b").failure.as_ref().unwrap().error,
            JumplineError::Config(_)
        ));
        assert!(matches!(
            &report("p.c").failure.as_ref().unwrap().error,
            JumplineError::CircularLogin(_)
        ));
    }

    #[test]
    fn test_batch_targets_include_parent_with_host() {
        let dir = sample();
        write(dir.path(), "dc/db2.yaml", "");
        write(dir.path(), "dc/db3.yaml", "NO_BATCH: true\n");
        let tree = ConfigTree::build(dir.path());
        let settings = settings();
        let selector = FixedSelector::new(0);
        let orchestrator = Orchestrator::new(&tree, &settings, &selector);

        let ids = |node: &str| -> Vec<String> {
            orchestrator
                .batch_targets(tree.get(node).unwrap())
                .into_iter()
                .map(|n| tree.node(n).id().to_string())
                .collect()
        };
        assert_eq!(ids("dc"), ["dc.db1", "dc.db2"]);
        assert_eq!(ids("dc.db1"), ["dc.db1"]);
        assert_eq!(ids(""), ["bastion", "dc.db1", "dc.db2"]);
    }
}
