use insta::assert_snapshot;
use tablemig::app::transform::{DocumentTransformer, TransformOptions};
use tablemig::infra::tables::MigrationTables;

const POD_LIST: &str = r#"<template>
  <div class="pods">
    <a-table :data="pods" v-loading="loading">
      <a-table-column type="selection" width="55" />
      <a-table-column label="名称" prop="name" min-width="180" show-overflow-tooltip />
      <a-table-column label="状态" width="100">
        <template #default="{ row }">
          <a-tag :color="statusColor(row.status)">{{ row.status }}</a-tag>
        </template>
      </a-table-column>
      <a-table-column label="Restarts" prop="restarts" align="center" />
      <a-table-column label="操作" width="160" fixed="right">
        <template #header>
          <span>操作</span>
        </template>
        <template #default="scope">
          <a-button @click="restart(scope.row, scope.$index)">重启</a-button>
        </template>
      </a-table-column>
      <template #empty>
        <a-empty />
      </template>
    </a-table>
  </div>
</template>

<script setup lang="ts">
import { ref } from 'vue'

const pods = ref([])
</script>
"#;

fn transformer() -> DocumentTransformer {
    let tables = MigrationTables::bundled().expect("bundled tables");
    DocumentTransformer::new(TransformOptions::default(), tables.slot_names)
}

#[test]
fn converts_pod_list_view() {
    let outcome = transformer().transform(POD_LIST);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.rewrites, 1);
    assert_snapshot!(outcome.text, @r#"
<template>
  <div class="pods">
    <a-table :data="pods" v-loading="loading" :columns="tableColumns" :row-selection="{ type: 'checkbox', showCheckedAll: true }">
      <template #status="{ record }">
        <a-tag :color="statusColor(record.status)">{{ record.status }}</a-tag>
      </template>
      <template #actions="{ record, rowIndex }">
        <a-button @click="restart(record, rowIndex)">重启</a-button>
      </template>
      <template #empty>
        <a-empty />
      </template>
    </a-table>
  </div>
</template>

<script setup lang="ts">
const tableColumns = [
  { title: '名称', dataIndex: 'name', width: 180, ellipsis: true, tooltip: true },
  { title: '状态', slotName: 'status', width: 100 },
  { title: 'Restarts', dataIndex: 'restarts', align: 'center' },
  { title: '操作', slotName: 'actions', width: 160, fixed: 'right' }
]

import { ref } from 'vue'

const pods = ref([])
</script>
"#);
}

#[test]
fn converted_view_is_stable() {
    let transformer = transformer();
    let first = transformer.transform(POD_LIST);
    let second = transformer.transform(&first.text);
    assert_eq!(second.text, first.text);
    assert_eq!(second.rewrites, 0);
}
