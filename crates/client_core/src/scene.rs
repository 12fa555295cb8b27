use shared::{
    domain::{ActiveTask, MapData, Point},
    protocol::RobotSnapshot,
};

/// Everything the map renderer needs for one frame.
///
/// Written by two parties only: the state-stream adapter (map, position, path, task)
/// and the interaction controller (view offset). `revision` increases on every write so
/// the host can tell when a redraw is due.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneModel {
    map_data: Option<MapData>,
    position: Option<Point>,
    path: Vec<Point>,
    task: Option<ActiveTask>,
    view_offset: Point,
    revision: u64,
}

impl SceneModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_data(&self) -> Option<&MapData> {
        self.map_data.as_ref()
    }

    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn task(&self) -> Option<&ActiveTask> {
        self.task.as_ref()
    }

    pub fn view_offset(&self) -> Point {
        self.view_offset
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Without map geometry nothing is drawable, whatever else is set.
    pub fn is_drawable(&self) -> bool {
        self.map_data.is_some()
    }

    /// Last snapshot wins: position, path and task are replaced, never merged.
    pub fn apply_snapshot(&mut self, snapshot: RobotSnapshot) {
        self.position = snapshot.position;
        self.path = snapshot.path;
        self.task = snapshot.task;
        self.bump();
    }

    pub fn install_map(&mut self, map: MapData) {
        self.map_data = Some(map);
        self.bump();
    }

    pub fn pan_by(&mut self, delta: Point) {
        if delta == Point::ORIGIN {
            return;
        }
        self.view_offset += delta;
        self.bump();
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
