//! 酒店会员积分服务
//!
//! 在积分引擎之上提供 REST API。
//!
//! ## 模块结构
//!
//! - `config`: 服务配置（公共配置 + 积分规则表 + Worker）
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误到 HTTP 响应的映射
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use dto::ApiResponse;
pub use error::{ApiError, Result};
pub use state::AppState;
