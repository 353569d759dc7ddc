//! 可选对象目录
//!
//! 每次切换学年、考试序列或模式时整体替换；选中时就检查可生成性，
//! 不可生成的对象永远进不了选中集合。

use std::collections::HashSet;

use crate::error::{AppResult, BusinessError};
use crate::models::{
    AvailabilityStatus, CatalogueEntry, GenerationParams, Target, TargetKind, TargetRef,
};

/// 目录统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogueSummary {
    pub total: usize,
    pub selectable: usize,
    pub generated: usize,
    pub fetch_failed: usize,
    pub not_found: usize,
}

#[derive(Debug, Default)]
pub struct Catalogue {
    params: Option<GenerationParams>,
    mode: Option<TargetKind>,
    entries: Vec<CatalogueEntry>,
    selected: HashSet<TargetRef>,
}

impl Catalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换目录，同时清空选中
    pub fn replace(
        &mut self,
        params: GenerationParams,
        mode: TargetKind,
        entries: Vec<CatalogueEntry>,
    ) {
        self.params = Some(params);
        self.mode = Some(mode);
        self.entries = entries;
        self.selected.clear();
    }

    pub fn params(&self) -> Option<GenerationParams> {
        self.params
    }

    pub fn mode(&self) -> Option<TargetKind> {
        self.mode
    }

    pub fn entries(&self) -> &[CatalogueEntry] {
        &self.entries
    }

    pub fn get(&self, target: TargetRef) -> Option<&CatalogueEntry> {
        self.entries.iter().find(|e| e.target_ref() == target)
    }

    /// 选中对象；不在目录中或不可生成时拒绝
    pub fn select(&mut self, target: TargetRef) -> AppResult<()> {
        let entry = self
            .get(target)
            .ok_or(BusinessError::TargetNotInCatalogue { target })?;

        if !entry.is_selectable() {
            return Err(BusinessError::TargetNotSelectable {
                target,
                status: entry.verdict.status.to_string(),
            }
            .into());
        }

        self.selected.insert(target);
        Ok(())
    }

    pub fn deselect(&mut self, target: TargetRef) -> bool {
        self.selected.remove(&target)
    }

    /// 切换选中状态，返回切换后是否选中
    pub fn toggle(&mut self, target: TargetRef) -> AppResult<bool> {
        if self.deselect(target) {
            return Ok(false);
        }
        self.select(target)?;
        Ok(true)
    }

    /// 选中所有可生成的对象，返回选中数量
    pub fn select_all_selectable(&mut self) -> usize {
        let selectable: Vec<TargetRef> = self
            .entries
            .iter()
            .filter(|e| e.is_selectable())
            .map(CatalogueEntry::target_ref)
            .collect();
        self.selected.extend(selectable);
        self.selected.len()
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, target: TargetRef) -> bool {
        self.selected.contains(&target)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// 选中的对象，按目录顺序
    pub fn selected_targets(&self) -> Vec<Target> {
        self.entries
            .iter()
            .filter(|e| self.selected.contains(&e.target_ref()))
            .map(|e| e.target.clone())
            .collect()
    }

    pub fn summary(&self) -> CatalogueSummary {
        let mut summary = CatalogueSummary {
            total: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            if entry.is_selectable() {
                summary.selectable += 1;
            }
            match entry.verdict.status {
                AvailabilityStatus::Generated => summary.generated += 1,
                AvailabilityStatus::FetchFailed => summary.fetch_failed += 1,
                AvailabilityStatus::NotFound => summary.not_found += 1,
                AvailabilityStatus::NotGenerated | AvailabilityStatus::Failed => {}
            }
        }
        summary
    }
}
