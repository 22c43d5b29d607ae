//! `list-links`: every link record as one JSON line.

use crate::context::ScriptContext;
use crate::error::ScriptResult;
use crate::report::{Report, NONE};

pub async fn report(ctx: &ScriptContext) -> ScriptResult<Report> {
    let mut report = Report::new("list-links");
    report.section("ALL LINKS");
    let links = ctx.linker.list(None).await?;
    if links.is_empty() {
        report.line(NONE);
    }
    for link in &links {
        report.line(link.to_json().to_string());
    }
    Ok(report)
}

pub async fn run(ctx: &ScriptContext) -> ScriptResult<()> {
    report(ctx).await?.emit();
    Ok(())
}
