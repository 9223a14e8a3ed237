//! README rendered into the adapter folder before upload.

pub const DEFAULT_BASE_MODEL: &str = "Qwen/Qwen2.5-VL-32B-Instruct";
pub const DEFAULT_LORA_RANK: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCard {
    pub base_model: String,
    pub adapter_repo: String,
    pub lora_rank: u32,
    pub target_modules: String,
    pub training_data: String,
}

impl ModelCard {
    pub fn new(base_model: impl Into<String>, adapter_repo: impl Into<String>) -> Self {
        Self {
            base_model: base_model.into(),
            adapter_repo: adapter_repo.into(),
            lora_rank: DEFAULT_LORA_RANK,
            target_modules: "all".to_string(),
            training_data: "Custom tool-use dataset".to_string(),
        }
    }

    fn short_model_name(&self) -> &str {
        self.base_model
            .rsplit('/')
            .next()
            .unwrap_or(&self.base_model)
    }

    pub fn render(&self) -> String {
        let name = self.short_model_name();
        format!(
            "\n# {name} with LoRA fine-tuning\n\n\
             This is a LoRA adapter for the {name} model, fine-tuned for tool-use with visual input.\n\n\
             ## Usage\n\n\
             ```python\n{snippet}```\n\n\
             ## Training Details\n\
             - Base model: {base}\n\
             - Fine-tuning method: LoRA with rank {rank}\n\
             - Target modules: {modules}\n\
             - Training data: {data}\n",
            name = name,
            snippet = usage_snippet(&self.base_model, &self.adapter_repo),
            base = self.base_model,
            rank = self.lora_rank,
            modules = self.target_modules,
            data = self.training_data,
        )
    }
}

/// Python snippet that loads `base_model`, applies the adapter and runs one
/// generation. Printed by `chatset usage` and embedded in the model card.
pub fn usage_snippet(base_model: &str, adapter_repo: &str) -> String {
    format!(
        r#"from transformers import AutoProcessor, AutoModelForCausalLM
from peft import PeftModel
import torch
from PIL import Image

# Load the model
processor = AutoProcessor.from_pretrained("{base}")
base_model = AutoModelForCausalLM.from_pretrained(
    "{base}",
    torch_dtype=torch.bfloat16,
    device_map="auto",
    trust_remote_code=True
)
model = PeftModel.from_pretrained(
    base_model,
    "{adapter}"
)

# Use the model
image = Image.open("your_image.jpg")
text = "What is in this image?"

inputs = processor(text=text, images=image, return_tensors="pt").to("cuda")
outputs = model.generate(**inputs, max_new_tokens=100)
result = processor.decode(outputs[0], skip_special_tokens=True)
print(result)
"#,
        base = base_model,
        adapter = adapter_repo,
    )
}
