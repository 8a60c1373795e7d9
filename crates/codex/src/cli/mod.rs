mod app_server;
mod cloud;
mod exec;
mod features;
mod help;
mod mcp;
mod responses_api_proxy;
mod review;
mod sandbox;
mod session;
mod stdio_to_uds;

pub use app_server::{AppServerCodegenOutput, AppServerCodegenRequest, AppServerCodegenTarget};
pub use cloud::{
    CloudExecRequest, CloudListOutput, CloudListRequest, CloudOverviewRequest, CloudStatusRequest,
};
pub use exec::ExecRequest;
pub use features::{
    CodexFeature, CodexFeatureStage, FeaturesCommandRequest, FeaturesListFormat,
    FeaturesListOutput, FeaturesListRequest,
};
pub use help::{HelpCommandRequest, HelpScope};
pub use mcp::{
    McpAddRequest, McpAddTransport, McpGetRequest, McpListOutput, McpListRequest, McpLogoutRequest,
    McpOauthLoginRequest, McpOverviewRequest, McpRemoveRequest,
};
pub use responses_api_proxy::{
    ResponsesApiProxyHandle, ResponsesApiProxyInfo, ResponsesApiProxyRequest,
};
pub use review::{ExecReviewCommandRequest, ReviewCommandRequest};
pub use sandbox::{SandboxCommandRequest, SandboxPlatform, SandboxRun};
pub use session::{ForkSessionRequest, ResumeSessionRequest};
pub use stdio_to_uds::StdioToUdsRequest;
