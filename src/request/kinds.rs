use crate::config::ApiContext;
use crate::error::Result;
use crate::request::builder::RequestBuilder;

/// The closed set of sandbox endpoint families the demo exercises. Each kind
/// is a path template plus a flag for whether the endpoint takes its payload
/// as a pre-encrypted opaque string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    CourseRuns,
    CourseSessions,
    Enrolment,
    Assessment,
    Attendance,
    SkillsFutureCredit,
}

impl ApiKind {
    pub fn path(&self) -> &'static str {
        match self {
            ApiKind::CourseRuns => "courses/runs",
            ApiKind::CourseSessions => "courses/runs/sessions",
            ApiKind::Enrolment => "tpg/enrolments",
            ApiKind::Assessment => "tpg/assessments",
            ApiKind::Attendance => "courses/runs/sessions/attendance",
            ApiKind::SkillsFutureCredit => "skillsFutureCredits/claims",
        }
    }

    /// Whether the endpoint's body must go through
    /// [`RequestBuilder::post_encrypted`] rather than a plain POST.
    pub fn requires_encryption(&self) -> bool {
        matches!(self, ApiKind::Attendance | ApiKind::SkillsFutureCredit)
    }
}

/// Build a request against `kind`'s endpoint, pre-configured with the
/// context's base URL and timeout. The caller chains headers, params, and
/// body onto the result and picks the send method `kind` calls for.
pub fn prepare(ctx: &ApiContext, kind: ApiKind) -> Result<RequestBuilder> {
    Ok(RequestBuilder::new()
        .with_endpoint(&ctx.base_url, kind.path())?
        .with_timeout(ctx.timeout))
}
