use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use returns_core::{
    format_policy_response, Clock, DomainError, EligibilityVerdict, Order, OrderCatalog,
    ReturnsRuntime, SampleOrderCatalog,
};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const CHECK_RETURN_ELIGIBILITY: &str = "check_return_eligibility";
pub const CALCULATE_REFUND_AMOUNT: &str = "calculate_refund_amount";
pub const FORMAT_POLICY_RESPONSE: &str = "format_policy_response";
pub const CURRENT_TIME: &str = "current_time";
pub const LOOKUP_ORDER: &str = "lookup_order";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("tool `{tool}` failed: {source}")]
    Execution {
        tool: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding every returns tool the support agent is allowed to call.
    /// Orders come from the sample catalog, dated relative to `clock`.
    pub fn returns_default(runtime: Arc<dyn ReturnsRuntime>, clock: Arc<dyn Clock>) -> Self {
        let orders: Arc<dyn OrderCatalog> = Arc::new(SampleOrderCatalog::new(clock.clone()));
        Self::returns_with_orders(runtime, clock, orders)
    }

    pub fn returns_with_orders(
        runtime: Arc<dyn ReturnsRuntime>,
        clock: Arc<dyn Clock>,
        orders: Arc<dyn OrderCatalog>,
    ) -> Self {
        let mut registry = Self::default();
        registry.register(CheckReturnEligibilityTool::new(runtime.clone()));
        registry.register(CalculateRefundAmountTool::new(runtime.clone()));
        registry.register(FormatPolicyResponseTool);
        registry.register(CurrentTimeTool::new(clock));
        registry.register(LookupOrderTool::new(orders, runtime));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|tool| ToolDescriptor { name: tool.name(), description: tool.description() })
            .collect();
        descriptors.sort_by_key(|descriptor| descriptor.name);
        descriptors
    }

    pub async fn invoke(&self, name: &str, input: Value) -> Result<Value, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.execute(input).await.map_err(|source| ToolError::Execution { tool: tool.name(), source })
    }
}

fn parse_input<T>(tool: &'static str, input: Value) -> Result<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(input)
        .map_err(|error| DomainError::invalid_input(tool, error.to_string()).into())
}

#[derive(Debug, Deserialize)]
struct EligibilityInput {
    purchase_date: String,
    category: String,
}

pub struct CheckReturnEligibilityTool {
    runtime: Arc<dyn ReturnsRuntime>,
}

impl CheckReturnEligibilityTool {
    pub fn new(runtime: Arc<dyn ReturnsRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Tool for CheckReturnEligibilityTool {
    fn name(&self) -> &'static str {
        CHECK_RETURN_ELIGIBILITY
    }

    fn description(&self) -> &'static str {
        "Check if an item is eligible for return from its purchase date (YYYY-MM-DD) and product category."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: EligibilityInput = parse_input(self.name(), input)?;
        let verdict = self.runtime.check_eligibility(&input.purchase_date, &input.category);
        Ok(serde_json::to_value(verdict)?)
    }
}

#[derive(Debug, Deserialize)]
struct RefundInput {
    original_price: Decimal,
    condition: String,
    return_reason: String,
}

pub struct CalculateRefundAmountTool {
    runtime: Arc<dyn ReturnsRuntime>,
}

impl CalculateRefundAmountTool {
    pub fn new(runtime: Arc<dyn ReturnsRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Tool for CalculateRefundAmountTool {
    fn name(&self) -> &'static str {
        CALCULATE_REFUND_AMOUNT
    }

    fn description(&self) -> &'static str {
        "Calculate the refund for an item from its original price, condition (new, opened, used, damaged) and return reason."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: RefundInput = parse_input(self.name(), input)?;
        let breakdown =
            self.runtime.calculate_refund(input.original_price, &input.condition, &input.return_reason);
        Ok(serde_json::to_value(breakdown)?)
    }
}

#[derive(Debug, Deserialize)]
struct PolicyInput {
    policy_text: String,
    #[serde(default)]
    customer_question: String,
}

pub struct FormatPolicyResponseTool;

#[async_trait]
impl Tool for FormatPolicyResponseTool {
    fn name(&self) -> &'static str {
        FORMAT_POLICY_RESPONSE
    }

    fn description(&self) -> &'static str {
        "Format raw return policy text in a customer-friendly layout, optionally echoing the customer's question."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: PolicyInput = parse_input(self.name(), input)?;
        let formatted = format_policy_response(&input.policy_text, &input.customer_question);
        Ok(json!({ "formatted": formatted }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct CurrentTimeInput {
    timezone: Option<String>,
}

pub struct CurrentTimeTool {
    clock: Arc<dyn Clock>,
}

impl CurrentTimeTool {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &'static str {
        CURRENT_TIME
    }

    fn description(&self) -> &'static str {
        "Return the current date and time. Only UTC is supported; other timezone names are rejected."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: CurrentTimeInput =
            if input.is_null() { CurrentTimeInput::default() } else { parse_input(self.name(), input)? };

        if let Some(timezone) = input.timezone.as_deref() {
            if !timezone.eq_ignore_ascii_case("utc") {
                return Err(DomainError::invalid_input(
                    "timezone",
                    format!("unsupported timezone `{timezone}` (only UTC is available)"),
                )
                .into());
            }
        }

        let now = self.clock.now();
        Ok(json!({
            "timezone": "UTC",
            "iso8601": now.to_rfc3339(),
            "date": now.date_naive().format("%Y-%m-%d").to_string(),
        }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct LookupOrderInput {
    #[serde(default)]
    order_id: String,
}

#[derive(Debug, Serialize)]
struct OrderLookup {
    #[serde(flatten)]
    order: Order,
    return_eligibility: EligibilityVerdict,
}

pub struct LookupOrderTool {
    orders: Arc<dyn OrderCatalog>,
    runtime: Arc<dyn ReturnsRuntime>,
}

impl LookupOrderTool {
    pub fn new(orders: Arc<dyn OrderCatalog>, runtime: Arc<dyn ReturnsRuntime>) -> Self {
        Self { orders, runtime }
    }
}

#[async_trait]
impl Tool for LookupOrderTool {
    fn name(&self) -> &'static str {
        LOOKUP_ORDER
    }

    fn description(&self) -> &'static str {
        "Look up an order by id (for example ORD-001) and report its details with current return eligibility."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let input: LookupOrderInput =
            if input.is_null() { LookupOrderInput::default() } else { parse_input(self.name(), input)? };
        let order_id = input.order_id.to_uppercase();
        if order_id.is_empty() {
            return Err(DomainError::invalid_input("order_id", "order_id is required").into());
        }

        let Some(order) = self.orders.find(&order_id) else {
            return Err(DomainError::not_found("order", order_id, self.orders.order_ids()).into());
        };

        let purchase_date = order.purchase_date.format("%Y-%m-%d").to_string();
        let return_eligibility = self.runtime.check_eligibility(&purchase_date, &order.category);
        Ok(serde_json::to_value(OrderLookup { order, return_eligibility })?)
    }
}
