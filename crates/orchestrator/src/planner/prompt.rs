use super::context::InventoryContext;

const PROMPT_HEADER: &str = "You are an expert IT migration specialist. Analyze this PC inventory and create a comprehensive migration plan.";

const PROMPT_BODY: &str = r#"Please provide:
1. **Migration Plan**: Detailed step-by-step migration strategy
2. **Installation Order**: Optimal order for installing applications with dependencies
3. **Tasks**: Specific tasks with estimated times and instructions
4. **Hardware Recommendation**: Recommended PC specs based on usage patterns
5. **Optimization Suggestions**: How to improve the setup on the new machine
6. **Manual Steps**: What cannot be automated and requires manual intervention
7. **Risk Assessment**: Potential issues and mitigation strategies
8. **Estimated Duration**: Total time needed for migration

Return your response as a JSON object with these keys:
- plan: detailed migration strategy
- tasks: array of task objects with name, order, estimated_minutes, instructions, dependencies
- hardware_spec: CPU, RAM, storage, GPU recommendations with justification
- recommendations: optimization suggestions
- manual_steps: array of manual intervention items
- estimated_minutes: total estimated duration
- risks: potential issues and mitigations
"#;

/// Instruction template with the inventory context embedded as indented JSON
pub fn build_plan_prompt(context: &InventoryContext) -> String {
    format!(
        "{PROMPT_HEADER}\n\nINVENTORY DATA:\n{}\n\n{PROMPT_BODY}",
        context.to_pretty_json()
    )
}
