// Application state for HTTP handlers
use crate::application::assessment_service::AssessmentService;
use crate::application::interchange_service::InterchangeService;
use crate::application::report_service::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub assessment_service: AssessmentService,
    pub report_service: ReportService,
    pub interchange_service: InterchangeService,
}
