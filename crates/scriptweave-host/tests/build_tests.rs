//! End-to-end builds through the reference host

use pretty_assertions::assert_eq;
use scriptweave_core::{
    BuildPlugin, HostPhase, HostPipeline, IntegrationError, IntegrationState, ResolvedConfig,
    ScriptWeave, TransformError, WeaveError,
};
use scriptweave_host::{ContentHash, OutputKind, ReferenceHost};
use scriptweave_test_utils::{mixed_project, page, FixtureProject};

fn fingerprint(content: &str) -> String {
    ContentHash::compute(content.as_bytes()).fingerprint()
}

#[tokio::test]
async fn delegated_build_rewrites_local_reference() {
    let project = mixed_project();
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    let report = host.run(&mut plugin).await.unwrap();

    let asset = format!("assets/init-{}.js", fingerprint("window.ready = true;\n"));
    let html = project.read_output("index.html");
    assert!(html.contains(&format!(r#"src="/{asset}""#)), "{html}");
    assert!(!html.contains(r#"src="/js/init.js""#));
    assert_eq!(project.read_output(&asset), "window.ready = true;\n");

    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].kind, OutputKind::Compiled);
    assert_eq!(report.outputs[0].file_name, asset);
    assert!(report.failed.is_empty());
    assert_eq!(plugin.last_rewrite().map(|r| r.replacements), Some(1));
    assert_eq!(
        plugin.context().map(|c| c.state()),
        Some(IntegrationState::Done)
    );
}

#[tokio::test]
async fn external_and_module_references_stay_byte_identical() {
    let project = mixed_project();
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    host.run(&mut plugin).await.unwrap();

    let source = project.read("index.html");
    let output = project.read_output("index.html");
    let untouched = |html: &str| -> Vec<String> {
        html.lines()
            .filter(|l| l.contains("cdn.example.com") || l.contains("type=\"module\""))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(untouched(&output), untouched(&source));
    assert_eq!(untouched(&output).len(), 2);
    assert_eq!(source.lines().count(), output.lines().count());
}

#[tokio::test]
async fn rewriting_twice_changes_nothing() {
    let project = mixed_project();
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);
    host.run(&mut plugin).await.unwrap();
    let first = project.read_output("index.html");

    plugin.close_bundle(&host).await.unwrap();

    assert_eq!(project.read_output("index.html"), first);
    let outcome = plugin.last_rewrite().unwrap();
    assert_eq!(outcome.replacements, 0);
    assert!(!outcome.written);
}

#[tokio::test]
async fn minified_units_are_named_after_final_content() {
    let project = FixtureProject::new()
        .with_page(&["js/app.js"])
        .with_file("js/app.js", "  start();\n\n  run();\n");
    let config = project.config().with_minify(true);
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    host.run(&mut plugin).await.unwrap();

    let asset = format!("assets/app-{}.js", fingerprint("start();\nrun();"));
    assert_eq!(project.read_output(&asset), "start();\nrun();");
    assert!(project
        .read_output("index.html")
        .contains(&format!(r#"src="/{asset}""#)));
}

#[tokio::test]
async fn dotted_stem_keeps_unit_extension() {
    let project = FixtureProject::new()
        .with_page(&["/js/jquery.min.js"])
        .with_file("js/jquery.min.js", "jQuery();\n");
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    let report = host.run(&mut plugin).await.unwrap();

    let asset = format!("assets/jquery.min-{}.js", fingerprint("jQuery();\n"));
    assert_eq!(report.outputs[0].file_name, asset);
    assert!(project.output_exists(&asset));
    assert!(project
        .read_output("index.html")
        .contains(&format!(r#"src="/{asset}""#)));
}

#[tokio::test]
async fn unquoted_and_padded_sources_are_rewritten() {
    let html = "<html>\n<head>\n  <script src=/js/a.js></script>\n  <script defer src=\" /js/b.js\"></script>\n</head>\n</html>\n";
    let project = FixtureProject::new()
        .with_file("index.html", html)
        .with_file("js/a.js", "a();\n")
        .with_file("js/b.js", "b();\n");
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    host.run(&mut plugin).await.unwrap();

    let output = project.read_output("index.html");
    assert!(
        output.contains(&format!("<script src=/assets/a-{}.js>", fingerprint("a();\n"))),
        "{output}"
    );
    assert!(
        output.contains(&format!(r#"src="/assets/b-{}.js""#, fingerprint("b();\n"))),
        "{output}"
    );
    assert!(!output.contains("/js/"));
    assert_eq!(plugin.last_rewrite().map(|r| r.replacements), Some(2));
}

#[tokio::test]
async fn passthrough_transform_output_is_emitted_verbatim() {
    let project = FixtureProject::new()
        .with_page(&["/js/a.js"])
        .with_file("js/a.js", "let a = 1;\n");
    let config = project.passthrough_config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config).with_transform(|source: &str, _: &ResolvedConfig| {
        Ok::<_, TransformError>(format!("/* woven */{source}"))
    });

    let report = host.run(&mut plugin).await.unwrap();

    let content = "/* woven */let a = 1;\n";
    let asset = format!("assets/a-{}.js", fingerprint(content));
    assert_eq!(project.read_output(&asset), content);
    assert_eq!(report.outputs[0].kind, OutputKind::Artifact);
    assert!(project
        .read_output("index.html")
        .contains(&format!(r#"src="/{asset}""#)));
    let record = &plugin.records()[0];
    assert!(record.unit_id().is_none());
    assert_eq!(record.final_location().unwrap(), asset);
}

#[tokio::test]
async fn passthrough_generate_bundle_can_run_again_after_close() {
    let project = FixtureProject::new()
        .with_page(&["/js/a.js"])
        .with_file("js/a.js", "let a = 1;\n");
    let config = project.passthrough_config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);
    host.run(&mut plugin).await.unwrap();
    let first = project.read_output("index.html");

    plugin.generate_bundle(&host).await.unwrap();
    plugin.close_bundle(&host).await.unwrap();

    assert_eq!(host.phase(), HostPhase::CloseBundle);
    assert_eq!(
        plugin.context().map(|c| c.state()),
        Some(IntegrationState::Done)
    );
    assert_eq!(project.read_output("index.html"), first);
}

#[tokio::test]
async fn failing_transform_falls_back_to_raw_content() {
    let project = FixtureProject::new()
        .with_page(&["/js/a.js"])
        .with_file("js/a.js", "let a = 1;\n");
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config).with_transform(|_: &str, _: &ResolvedConfig| {
        Err::<String, _>(TransformError::failed("syntax error"))
    });

    let report = host.run(&mut plugin).await.unwrap();

    let asset = format!("assets/a-{}.js", fingerprint("let a = 1;\n"));
    assert_eq!(project.read_output(&asset), "let a = 1;\n");
    assert_eq!(report.warnings(), 1);
    assert!(report.diagnostics[0].message.contains("syntax error"));
    assert!(project
        .read_output("index.html")
        .contains(&format!(r#"src="/{asset}""#)));
}

#[tokio::test]
async fn failed_unit_does_not_affect_others() {
    let project = FixtureProject::new()
        .with_page(&["/js/a.js", "/js/missing.js"])
        .with_file("js/a.js", "a();\n");
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    let report = host.run(&mut plugin).await.unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.outputs.len(), 1);
    assert!(report.errors() >= 1);
    let html = project.read_output("index.html");
    assert!(html.contains(&format!(r#"src="/assets/a-{}.js""#, fingerprint("a();\n"))));
    assert!(html.contains(r#"src="/js/missing.js""#));

    let finalized: Vec<_> = plugin
        .records()
        .iter()
        .map(|r| (r.original_path(), r.is_finalized()))
        .collect();
    assert_eq!(finalized, vec![("/js/a.js", true), ("/js/missing.js", false)]);
}

#[tokio::test]
async fn source_document_is_read_once() {
    let project = mixed_project();
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);
    host.run(&mut plugin).await.unwrap();

    let context = plugin.context().unwrap();
    let again = context.scanner().scan(context.document()).await;

    assert_eq!(again.len(), 1);
    let stats = context.scanner().cache().stats();
    assert_eq!(stats.reads, 1);
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn missing_document_builds_nothing() {
    let project = FixtureProject::new().with_file("js/a.js", "a();\n");
    let config = project.config();
    let host = ReferenceHost::from_config(&config);
    let mut plugin = ScriptWeave::new(config);

    let report = host.run(&mut plugin).await.unwrap();

    assert!(report.outputs.is_empty());
    assert!(report.document.is_none());
    assert!(plugin.records().is_empty());
    assert_eq!(plugin.last_rewrite().map(|r| r.written), Some(false));
}

#[tokio::test]
async fn each_build_starts_from_a_fresh_context() {
    let project = FixtureProject::new()
        .with_page(&["/js/a.js"])
        .with_file("js/a.js", "a();\n");
    let mut plugin = ScriptWeave::new(project.config());

    ReferenceHost::from_config(plugin.config())
        .run(&mut plugin)
        .await
        .unwrap();
    project.write("index.html", &page(&["/js/b.js"]));
    project.write("js/b.js", "b();\n");
    ReferenceHost::from_config(plugin.config())
        .run(&mut plugin)
        .await
        .unwrap();

    let originals: Vec<_> = plugin.records().iter().map(|r| r.original_path()).collect();
    assert_eq!(originals, vec!["/js/b.js"]);
    assert!(project
        .read_output("index.html")
        .contains(&format!(r#"src="/assets/b-{}.js""#, fingerprint("b();\n"))));
}

#[tokio::test]
#[cfg(not(feature = "strict-debug"))]
async fn resolving_before_host_finalization_fails_fast() {
    let project = mixed_project();
    let host = ReferenceHost::from_config(&project.config());
    let mut plugin = ScriptWeave::new(project.config());

    host.advance_to(HostPhase::BuildStart).unwrap();
    plugin.build_start(&host).await.unwrap();
    host.advance_to(HostPhase::Transform).unwrap();

    let err = plugin.generate_bundle(&host).await.unwrap_err();

    assert!(matches!(
        err,
        WeaveError::Integration(IntegrationError::PhaseViolation {
            phase: HostPhase::Transform,
            ..
        })
    ));
    assert_eq!(host.phase(), HostPhase::Transform);
}

#[tokio::test]
async fn host_cannot_run_twice() {
    let project = mixed_project();
    let host = ReferenceHost::from_config(&project.config());
    let mut plugin = ScriptWeave::new(project.config());
    host.run(&mut plugin).await.unwrap();

    let err = host.run(&mut plugin).await.unwrap_err();

    assert!(matches!(
        err,
        scriptweave_host::HostBuildError::Lifecycle {
            from: HostPhase::CloseBundle,
            to: HostPhase::BuildStart
        }
    ));
}
