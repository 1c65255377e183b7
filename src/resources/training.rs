use super::cache::RecordCache;
use super::ResourceError;
use crate::models::resources::TrainingExample;

/// Session-only store; the examples are kept and listed but never fed to anything.
#[derive(Debug, Clone, Default)]
pub struct TrainingManager {
    cache: RecordCache<TrainingExample>,
}

impl TrainingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<TrainingExample> {
        self.cache.snapshot()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn add(
        &self,
        input: &str,
        output: &str,
        category: &str
    ) -> Result<TrainingExample, ResourceError> {
        if input.trim().is_empty() || output.trim().is_empty() || category.trim().is_empty() {
            return Err(
                ResourceError::Validation("Для обучения нужны вход, выход и категория".to_string())
            );
        }
        let example = TrainingExample::new(input, output, category);
        self.cache.push(example.clone());
        Ok(example)
    }

    pub fn delete(&self, id: &str) -> Result<(), ResourceError> {
        match self.cache.remove_where(|e| e.id == id) {
            0 => Err(ResourceError::NotFound { kind: "training example", id: id.to_string() }),
            _ => Ok(()),
        }
    }
}
