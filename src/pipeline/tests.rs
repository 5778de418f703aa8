//! Scenario tests for the push pipeline.

use super::*;
use crate::effects::RemoteEffect;
use crate::refs::RefKind;
use crate::test_utils::{
    FakeHistory, FakePlatform, FakeRemote, commit_author_user, open_issue, sample_commit,
    sample_project, sample_user,
};
use crate::trackers::{AnyTracker, ExternalTracker, InternalTracker};
use crate::types::{IssueIid, ProtectionLevel, UserId};

const BASE: &str = "http://example.com";

type TestPipeline = PushPipeline<FakePlatform, AnyTracker<FakePlatform, FakeRemote>>;

fn sha(c: char) -> Sha {
    Sha::new(c.to_string().repeat(40))
}

fn internal_pipeline(platform: &FakePlatform) -> TestPipeline {
    PushPipeline::new(
        platform.clone(),
        AnyTracker::Internal(InternalTracker::new(platform.clone())),
        BASE,
    )
}

fn external_pipeline(platform: &FakePlatform, remote: &FakeRemote) -> TestPipeline {
    PushPipeline::new(
        platform.clone(),
        AnyTracker::External(ExternalTracker::new(remote.clone(), None, 2)),
        BASE,
    )
}

fn request(before: Sha, after: Sha, ref_name: &str) -> PushRequest {
    PushRequest {
        before,
        after,
        ref_name: ref_name.to_string(),
    }
}

/// History for a one-commit update `a..b`.
fn one_commit(message: &str) -> FakeHistory {
    FakeHistory::new().with_range(sha('a'), sha('b'), vec![sample_commit('b', message)])
}

// ─── Payload and event log ────────────────────────────────────────────────────

#[tokio::test]
async fn one_commit_push_to_master() {
    let platform = FakePlatform::new();
    let pipeline = internal_pipeline(&platform);
    let history = one_commit("Add feature");

    let outcome = pipeline
        .process(
            &history,
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.change.kind, RefKind::BranchUpdated);
    assert!(outcome.change.is_default_branch);
    assert_eq!(outcome.commit_count, 1);
    assert_eq!(outcome.event_id, Some(EventId(1)));
    assert!(outcome.webhook_delivered);

    let events = platform.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.before, sha('a'));
    assert_eq!(event.after, sha('b'));
    assert_eq!(event.ref_name, "refs/heads/master");
    assert_eq!(event.commits.len(), 1);

    let deliveries = platform.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(&deliveries[0].0, event);
    assert!(deliveries[0].1);
}

#[tokio::test]
async fn commit_order_survives_concurrent_scanning() {
    let platform = FakePlatform::new()
        .with_issue(open_issue(100, 1))
        .with_issue(open_issue(101, 2));
    let pipeline = internal_pipeline(&platform);
    let commits = vec![
        sample_commit('c', "first, see #1"),
        sample_commit('d', "second"),
        sample_commit('e', "third, see #2"),
        sample_commit('f', "fourth"),
    ];
    let history = FakeHistory::new().with_range(sha('a'), sha('f'), commits);

    let outcome = pipeline
        .process(
            &history,
            &request(sha('a'), sha('f'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.notes_created, 2);
    let ids: Vec<_> = platform.events()[0]
        .commits
        .iter()
        .map(|c| c.id.clone())
        .collect();
    assert_eq!(ids, [sha('c'), sha('d'), sha('e'), sha('f')]);
}

#[tokio::test]
async fn event_log_failure_does_not_stop_the_push() {
    let platform = FakePlatform::new()
        .with_issue(open_issue(100, 3))
        .failing_on("append_event");
    let pipeline = internal_pipeline(&platform);
    let history = one_commit("Closes #3");

    let outcome = pipeline
        .process(
            &history,
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.event_id, None);
    assert!(outcome.webhook_delivered);
    assert_eq!(outcome.issues_closed, 1);
}

#[tokio::test]
async fn precondition_failures_issue_no_effects() {
    let platform = FakePlatform::new();
    let pipeline = internal_pipeline(&platform);
    let history = one_commit("Add feature");

    let err = pipeline
        .process(
            &history,
            &request(Sha::blank(), Sha::blank(), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Payload(PayloadError::BothRevisionsBlank)
    ));

    let mut nameless = sample_user();
    nameless.name = String::new();
    let err = pipeline
        .process(
            &history,
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &nameless,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Payload(PayloadError::MissingUserIdentity(UserId(4)))
    ));

    assert!(platform.journal().is_empty());
    assert!(history.queries().is_empty());
}

// ─── Webhooks and protection ──────────────────────────────────────────────────

#[tokio::test]
async fn tag_push_never_delivers() {
    let platform = FakePlatform::new();
    let pipeline = internal_pipeline(&platform);
    let history = FakeHistory::new().with_ancestry(sha('b'), vec![sample_commit('b', "x")]);

    let outcome = pipeline
        .process(
            &history,
            &request(Sha::blank(), sha('b'), "refs/tags/v1.0.0"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.change.kind, RefKind::NonBranchRef);
    assert!(!outcome.webhook_delivered);
    assert_eq!(outcome.commit_count, 0);
    assert!(platform.deliveries().is_empty());
    assert!(platform.protected().is_empty());
}

async fn first_push_of_master(level: ProtectionLevel) -> (FakePlatform, PushOutcome) {
    let platform = FakePlatform::new();
    let pipeline = internal_pipeline(&platform);
    let mut project = sample_project();
    project.default_branch = None;
    project.branch_protection = level;
    let history = FakeHistory::new().with_head("master").with_ancestry_of_ref(
        "refs/heads/master",
        vec![sample_commit('a', "initial"), sample_commit('b', "second")],
    );

    let outcome = pipeline
        .process(
            &history,
            &request(Sha::blank(), sha('b'), "refs/heads/master"),
            &project,
            &sample_user(),
        )
        .await
        .unwrap();
    (platform, outcome)
}

#[tokio::test]
async fn first_push_delivers_and_protects() {
    for (level, developers_can_push) in [
        (ProtectionLevel::PrivilegedOnly, false),
        (ProtectionLevel::DevelopersCanPush, true),
        (ProtectionLevel::default(), false),
    ] {
        let (platform, outcome) = first_push_of_master(level).await;

        assert_eq!(outcome.change.kind, RefKind::BranchCreated);
        assert!(outcome.webhook_delivered);
        assert_eq!(outcome.commit_count, 2);
        assert_eq!(outcome.protected_branch.as_deref(), Some("master"));
        assert_eq!(
            platform.protected(),
            [(sample_project().id, "master".to_string(), developers_can_push)]
        );
        let kinds = platform.journal_kinds();
        let protect = kinds.iter().position(|k| *k == "protect_branch").unwrap();
        let deliver = kinds.iter().position(|k| *k == "deliver_webhook").unwrap();
        assert!(protect < deliver);
    }
}

#[tokio::test]
async fn first_push_without_protection() {
    let (platform, outcome) = first_push_of_master(ProtectionLevel::Unprotected).await;
    assert!(outcome.webhook_delivered);
    assert_eq!(outcome.protected_branch, None);
    assert!(platform.protected().is_empty());
}

// ─── Closing ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn closing_keyword_closes_on_default_branch_only() {
    for (ref_name, should_close) in [("refs/heads/master", true), ("refs/heads/feature", false)] {
        let platform = FakePlatform::new().with_issue(open_issue(100, 3));
        let pipeline = internal_pipeline(&platform);
        let history = one_commit("Fix crash\n\nCloses #3");

        let outcome = pipeline
            .process(
                &history,
                &request(sha('a'), sha('b'), ref_name),
                &sample_project(),
                &sample_user(),
            )
            .await
            .unwrap();

        let issue = platform.issue(IssueIid(3)).unwrap();
        assert_eq!(issue.is_closed(), should_close, "{ref_name}");
        assert_eq!(outcome.issues_closed, usize::from(should_close));
        assert!(platform.notes().is_empty(), "{ref_name}");
    }
}

#[tokio::test]
async fn closing_is_attributed_to_the_known_author() {
    let platform = FakePlatform::new()
        .with_user(commit_author_user())
        .with_issue(open_issue(100, 3));
    let pipeline = internal_pipeline(&platform);

    pipeline
        .process(
            &one_commit("fixes #3"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(platform.closed_by(), [(IssueIid(3), commit_author_user().id)]);
}

#[tokio::test]
async fn already_closed_issue_is_left_alone() {
    let mut issue = open_issue(100, 3);
    issue.state = crate::types::IssueState::Closed;
    let platform = FakePlatform::new().with_issue(issue);
    let pipeline = internal_pipeline(&platform);

    let outcome = pipeline
        .process(
            &one_commit("Closes #3"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.issues_closed, 0);
    assert!(platform.closed_by().is_empty());
}

// ─── Cross-references ─────────────────────────────────────────────────────────

#[tokio::test]
async fn mention_creates_one_note_for_known_author() {
    let platform = FakePlatform::new()
        .with_user(commit_author_user())
        .with_issue(open_issue(100, 3));
    let pipeline = internal_pipeline(&platform);
    let history = one_commit("Refactor, see #3");
    let push = request(sha('a'), sha('b'), "refs/heads/feature");

    let outcome = pipeline
        .process(&history, &push, &sample_project(), &sample_user())
        .await
        .unwrap();
    assert_eq!(outcome.notes_created, 1);

    let notes = platform.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].author_id, commit_author_user().id);
    assert_eq!(notes[0].commit_id, sha('b'));

    // Same push again: the store answers AlreadyExists.
    let outcome = pipeline
        .process(&history, &push, &sample_project(), &sample_user())
        .await
        .unwrap();
    assert_eq!(outcome.notes_created, 0);
    assert_eq!(platform.notes().len(), 1);
}

#[tokio::test]
async fn mention_by_unknown_author_is_attributed_to_pusher() {
    let platform = FakePlatform::new().with_issue(open_issue(100, 3));
    let pipeline = internal_pipeline(&platform);

    pipeline
        .process(
            &one_commit("see #3"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    let notes = platform.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].author_id, sample_user().id);
}

#[tokio::test]
async fn unknown_issues_are_dropped() {
    let platform = FakePlatform::new();
    let pipeline = internal_pipeline(&platform);

    let outcome = pipeline
        .process(
            &one_commit("see #404, closes #405"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.references, 0);
    assert!(platform.notes().is_empty());
    assert!(!platform.journal_kinds().contains(&"find_user_by_email"));
}

#[tokio::test]
async fn mention_and_close_in_one_commit() {
    let platform = FakePlatform::new()
        .with_issue(open_issue(100, 3))
        .with_issue(open_issue(101, 4));
    let pipeline = internal_pipeline(&platform);

    let outcome = pipeline
        .process(
            &one_commit("Closes #3, related to #4 and #3"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.references, 2);
    assert_eq!(outcome.issues_closed, 1);
    assert_eq!(outcome.notes_created, 1);
    let notes = platform.notes();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].issue_id, open_issue(101, 4).id);
}

// ─── External tracker ─────────────────────────────────────────────────────────

#[tokio::test]
async fn external_close_calls_remote_once_each() {
    let platform = FakePlatform::new();
    let remote = FakeRemote::new();
    let pipeline = external_pipeline(&platform, &remote);

    let outcome = pipeline
        .process(
            &one_commit("closes JIRA-1"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.issues_closed, 1);
    assert_eq!(remote.transitions(), [("JIRA-1".to_string(), 2)]);
    let comments = remote.comments();
    assert_eq!(comments.len(), 1);
    let commit_id = "b".repeat(40);
    assert!(comments[0].1.contains(&commit_id));
    assert!(
        comments[0]
            .1
            .contains(&format!("{BASE}/group/gitlab-test/commit/{commit_id}"))
    );
    assert!(platform.notes().is_empty());
}

#[tokio::test]
async fn external_close_on_feature_branch_does_nothing() {
    let platform = FakePlatform::new();
    let remote = FakeRemote::new();
    let pipeline = external_pipeline(&platform, &remote);

    pipeline
        .process(
            &one_commit("closes JIRA-1"),
            &request(sha('a'), sha('b'), "refs/heads/feature"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn external_mention_posts_comment() {
    let platform = FakePlatform::new();
    let remote = FakeRemote::new();
    let pipeline = external_pipeline(&platform, &remote);

    let outcome = pipeline
        .process(
            &one_commit("Touches JIRA-7"),
            &request(sha('a'), sha('b'), "refs/heads/feature"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.notes_created, 1);
    assert!(matches!(
        remote.calls().as_slice(),
        [RemoteEffect::PostComment { issue_key, .. }] if issue_key == "JIRA-7"
    ));
}

#[tokio::test]
async fn external_failures_do_not_fail_the_push() {
    let platform = FakePlatform::new();
    let remote = FakeRemote::failing();
    let pipeline = external_pipeline(&platform, &remote);

    let outcome = pipeline
        .process(
            &one_commit("closes JIRA-1, see OPS-2"),
            &request(sha('a'), sha('b'), "refs/heads/master"),
            &sample_project(),
            &sample_user(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.issues_closed, 0);
    assert_eq!(outcome.notes_created, 0);
    assert_eq!(outcome.event_id, Some(EventId(1)));
    assert_eq!(remote.calls().len(), 3);
}
