//! Per-kind appearance state machines.
//!
//! Every machine here is driven purely by the state string of the most
//! recent snapshot. None of them owns a timer; the simulation decides when
//! lights change and when a chase starts.

use std::str::FromStr;
use thiserror::Error;

use sync_events::AgentKind;

/// A state string outside the vocabulary of the machine it was sent to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized state: '{0}'")]
pub struct UnrecognizedState(pub String);

// ---------------------------------------------------------------------------
// Traffic lights
// ---------------------------------------------------------------------------

/// One lamp of a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LampState {
    Green,
    Yellow,
    Red,
}

impl LampState {
    pub fn all() -> &'static [LampState] {
        &[LampState::Green, LampState::Yellow, LampState::Red]
    }
}

impl FromStr for LampState {
    type Err = UnrecognizedState;

    /// Lamp names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "green" => Ok(LampState::Green),
            "yellow" => Ok(LampState::Yellow),
            "red" => Ok(LampState::Red),
            _ => Err(UnrecognizedState(s.to_string())),
        }
    }
}

/// Exclusive Green/Yellow/Red state of a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficLightLamps {
    active: LampState,
}

impl Default for TrafficLightLamps {
    fn default() -> Self {
        Self {
            active: LampState::Green,
        }
    }
}

impl TrafficLightLamps {
    pub fn active(&self) -> LampState {
        self.active
    }

    /// Whether the given lamp is lit.
    pub fn is_lit(&self, lamp: LampState) -> bool {
        self.active == lamp
    }

    /// Applies a state string. Unrecognized values keep the current lamp.
    pub fn set_state(&mut self, state: &str) -> Result<LampState, UnrecognizedState> {
        self.active = state.parse()?;
        Ok(self.active)
    }
}

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

/// Vehicle subtype, derived from the agent kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleClass {
    Plain,
    Police,
    Chaotic,
}

impl VehicleClass {
    /// Returns the vehicle class of a kind, or `None` for non-vehicles.
    pub fn of(kind: AgentKind) -> Option<Self> {
        match kind {
            AgentKind::Vehicle => Some(VehicleClass::Plain),
            AgentKind::PoliceVehicle => Some(VehicleClass::Police),
            AgentKind::ChaoticVehicle => Some(VehicleClass::Chaotic),
            AgentKind::TrafficLight | AgentKind::Obstacle | AgentKind::Destination => None,
        }
    }
}

/// Visual treatment of a vehicle body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Treatment {
    /// Police with sirens on
    Alert,
    /// Police making an arrest
    Arrest,
    /// Police on patrol
    Patrol,
    /// Chaotic driver fleeing the police
    Flee,
    /// Chaotic driver under arrest
    Neutralized,
    /// Chaotic driver roaming
    Chaos,
    /// Ordinary traffic
    Civilian,
}

impl Treatment {
    /// Body color as sRGB components.
    pub fn rgb(&self) -> [f32; 3] {
        match self {
            Treatment::Alert => [1.0, 0.0, 0.0],
            Treatment::Arrest => [0.0, 1.0, 1.0],
            Treatment::Patrol => [0.0, 0.0, 1.0],
            Treatment::Flee => [1.0, 0.5, 0.0],
            Treatment::Neutralized => [0.5, 0.5, 0.5],
            Treatment::Chaos => [1.0, 0.0, 1.0],
            Treatment::Civilian => [1.0, 1.0, 1.0],
        }
    }
}

/// Maps a vehicle class and its current state string to a treatment.
///
/// Pure: the result depends only on the arguments, so applying a state twice
/// or after any other state gives the same treatment.
pub fn vehicle_treatment(class: VehicleClass, state: Option<&str>) -> Treatment {
    match (class, state) {
        (VehicleClass::Police, Some("CHASE")) => Treatment::Alert,
        (VehicleClass::Police, Some("ARRESTING")) => Treatment::Arrest,
        (VehicleClass::Police, _) => Treatment::Patrol,
        (VehicleClass::Chaotic, Some("ESCAPING")) => Treatment::Flee,
        (VehicleClass::Chaotic, Some("ARRESTED")) => Treatment::Neutralized,
        (VehicleClass::Chaotic, _) => Treatment::Chaos,
        (VehicleClass::Plain, _) => Treatment::Civilian,
    }
}

// ---------------------------------------------------------------------------
// Parking slots
// ---------------------------------------------------------------------------

/// Occupancy of a destination parking slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParkingState {
    Free,
    Reserved,
    Occupied,
}

impl FromStr for ParkingState {
    type Err = UnrecognizedState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Free" => Ok(ParkingState::Free),
            "Reserved" => Ok(ParkingState::Reserved),
            "Occupied" => Ok(ParkingState::Occupied),
            _ => Err(UnrecognizedState(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-entity appearance
// ---------------------------------------------------------------------------

/// Appearance state carried by each tracked entity, one variant per kind family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Vehicle {
        class: VehicleClass,
        treatment: Treatment,
    },
    TrafficLight(TrafficLightLamps),
    /// `None` until the first recognized slot state arrives
    Parking(Option<ParkingState>),
    Static,
}

impl Appearance {
    /// Initial appearance for a freshly created entity.
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Vehicle | AgentKind::PoliceVehicle | AgentKind::ChaoticVehicle => {
                let class = VehicleClass::of(kind).unwrap_or(VehicleClass::Plain);
                Appearance::Vehicle {
                    class,
                    treatment: vehicle_treatment(class, None),
                }
            }
            AgentKind::TrafficLight => Appearance::TrafficLight(TrafficLightLamps::default()),
            AgentKind::Destination => Appearance::Parking(None),
            AgentKind::Obstacle => Appearance::Static,
        }
    }

    /// Feeds the latest state string to the machine for this kind.
    pub fn apply(&mut self, state: Option<&str>) -> Result<(), UnrecognizedState> {
        match self {
            Appearance::Vehicle { class, treatment } => {
                *treatment = vehicle_treatment(*class, state);
                Ok(())
            }
            Appearance::TrafficLight(lamps) => match state {
                Some(state) => lamps.set_state(state).map(|_| ()),
                None => Err(UnrecognizedState(String::new())),
            },
            Appearance::Parking(slot) => match state {
                Some(state) => {
                    *slot = Some(state.parse()?);
                    Ok(())
                }
                // Slots without a state keep their material
                None => Ok(()),
            },
            Appearance::Static => Ok(()),
        }
    }

    pub fn lamps(&self) -> Option<&TrafficLightLamps> {
        match self {
            Appearance::TrafficLight(lamps) => Some(lamps),
            _ => None,
        }
    }

    pub fn treatment(&self) -> Option<Treatment> {
        match self {
            Appearance::Vehicle { treatment, .. } => Some(*treatment),
            _ => None,
        }
    }

    pub fn parking(&self) -> Option<ParkingState> {
        match self {
            Appearance::Parking(slot) => *slot,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lamps_exclusive_after_every_state() {
        let mut lamps = TrafficLightLamps::default();
        for state in ["green", "Yellow", "RED", "red", "GREEN"] {
            lamps.set_state(state).unwrap();
            let lit = LampState::all().iter().filter(|l| lamps.is_lit(**l)).count();
            assert_eq!(lit, 1, "state {}", state);
        }
        assert_eq!(lamps.active(), LampState::Green);
    }

    #[test]
    fn test_unknown_lamp_state_keeps_current() {
        let mut lamps = TrafficLightLamps::default();
        lamps.set_state("red").unwrap();
        let err = lamps.set_state("blinking").unwrap_err();
        assert_eq!(err, UnrecognizedState("blinking".to_string()));
        assert_eq!(lamps.active(), LampState::Red);
    }

    #[test]
    fn test_vehicle_treatment_table() {
        use Treatment::*;
        use VehicleClass::*;
        assert_eq!(vehicle_treatment(Police, Some("CHASE")), Alert);
        assert_eq!(vehicle_treatment(Police, Some("ARRESTING")), Arrest);
        assert_eq!(vehicle_treatment(Police, Some("PATROL")), Patrol);
        assert_eq!(vehicle_treatment(Police, None), Patrol);
        assert_eq!(vehicle_treatment(Chaotic, Some("ESCAPING")), Flee);
        assert_eq!(vehicle_treatment(Chaotic, Some("ARRESTED")), Neutralized);
        assert_eq!(vehicle_treatment(Chaotic, Some("DRIVING")), Chaos);
        assert_eq!(vehicle_treatment(Plain, Some("CHASE")), Civilian);
        assert_eq!(vehicle_treatment(Plain, None), Civilian);
    }

    #[test]
    fn test_vehicle_states_are_case_sensitive() {
        assert_eq!(
            vehicle_treatment(VehicleClass::Police, Some("chase")),
            Treatment::Patrol
        );
    }

    #[test]
    fn test_vehicle_appearance_has_no_memory() {
        let mut direct = Appearance::for_kind(AgentKind::PoliceVehicle);
        direct.apply(Some("ARRESTING")).unwrap();

        let mut sequenced = Appearance::for_kind(AgentKind::PoliceVehicle);
        sequenced.apply(Some("CHASE")).unwrap();
        sequenced.apply(Some("ARRESTING")).unwrap();

        assert_eq!(direct, sequenced);
        assert_eq!(direct.treatment(), Some(Treatment::Arrest));

        sequenced.apply(Some("ARRESTING")).unwrap();
        assert_eq!(direct, sequenced);
    }

    #[test]
    fn test_parking_states() {
        let mut slot = Appearance::for_kind(AgentKind::Destination);
        assert_eq!(slot.parking(), None);

        slot.apply(Some("Reserved")).unwrap();
        assert_eq!(slot.parking(), Some(ParkingState::Reserved));

        assert!(slot.apply(Some("Closed")).is_err());
        assert_eq!(slot.parking(), Some(ParkingState::Reserved));

        slot.apply(None).unwrap();
        assert_eq!(slot.parking(), Some(ParkingState::Reserved));

        slot.apply(Some("Occupied")).unwrap();
        assert_eq!(slot.parking(), Some(ParkingState::Occupied));
    }

    #[test]
    fn test_traffic_light_without_state_is_unrecognized() {
        let mut light = Appearance::for_kind(AgentKind::TrafficLight);
        assert!(light.apply(None).is_err());
        assert_eq!(light.lamps().map(|l| l.active()), Some(LampState::Green));
    }

    #[test]
    fn test_static_kinds_ignore_state() {
        let mut obstacle = Appearance::for_kind(AgentKind::Obstacle);
        obstacle.apply(Some("anything")).unwrap();
        assert_eq!(obstacle, Appearance::Static);
    }

    #[test]
    fn test_vehicle_class_of() {
        assert_eq!(VehicleClass::of(AgentKind::Vehicle), Some(VehicleClass::Plain));
        assert_eq!(VehicleClass::of(AgentKind::TrafficLight), None);
    }
}
